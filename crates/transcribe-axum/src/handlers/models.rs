//! Model registry handlers: register, list, download, set-default,
//! remove.

use axum::extract::{Path, Query, State};
use axum::Json;

use transcribe_core::domain::{Model, NewModel};

use crate::dto::{DeleteModelQuery, DownloadModelRequest, RegisterModelRequest};
use crate::error::HttpError;
use crate::state::AppState;

/// `GET /api/models`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Model>>, HttpError> {
    Ok(Json(state.models.list().await?))
}

/// `POST /api/models`
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterModelRequest>,
) -> Result<Json<Model>, HttpError> {
    let desc = NewModel {
        name: request.name,
        model_type: request.model_type,
        engine: request.engine,
        source: request.source,
        upstream_id: request.upstream_id,
        revision: request.revision,
        capabilities: request.capabilities,
        is_default: request.is_default,
    };
    Ok(Json(state.models.register(desc).await?))
}

/// `POST /api/models/{id}/download`
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<DownloadModelRequest>>,
) -> Result<Json<Model>, HttpError> {
    let force = body.map(|Json(b)| b.force).unwrap_or_default();
    Ok(Json(state.models.download(id, force).await?))
}

/// `POST /api/models/{id}/set-default`
pub async fn set_default(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Model>, HttpError> {
    Ok(Json(state.models.set_default(id).await?))
}

/// `DELETE /api/models/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<DeleteModelQuery>,
) -> Result<(), HttpError> {
    state.models.delete(id, query.remove_files).await?;
    Ok(())
}

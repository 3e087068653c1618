//! Route definitions and router construction.
//!
//! Handlers delegate to the shared `AxumContext`, reached through
//! [`AppState`].

use std::path::Path;
use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            use axum::http::HeaderValue;
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Build all API routes without the `/api` prefix, for nesting.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        // Jobs
        .route("/jobs", get(handlers::jobs::list).post(handlers::jobs::create))
        .route(
            "/jobs/{id}",
            get(handlers::jobs::get).delete(handlers::jobs::remove),
        )
        .route("/jobs/{id}/transcript", get(handlers::jobs::transcript))
        .route("/jobs/{id}/speakers", patch(handlers::jobs::remap_speakers))
        // Batches
        .route("/batches", post(handlers::batches::create))
        .route(
            "/batches/{id}",
            get(handlers::batches::get).delete(handlers::batches::remove),
        )
        .route("/batches/{id}/export", get(handlers::batches::export))
        // Queue
        .route("/queue", get(handlers::queue::snapshot))
        .route("/queue/reorder", post(handlers::queue::reorder))
        .route("/queue/{id}/priority", post(handlers::queue::set_priority))
        .route("/queue/ws", get(handlers::queue::queue_ws))
        // Streaming transcription
        .route("/stream/ws", get(handlers::stream::stream_ws))
        // Models
        .route("/models", get(handlers::models::list).post(handlers::models::register))
        .route("/models/{id}", delete(handlers::models::remove))
        .route("/models/{id}/download", post(handlers::models::download))
        .route("/models/{id}/set-default", post(handlers::models::set_default))
        // System diagnostics
        .route("/system/hardware", get(handlers::system::hardware))
        .route("/system/evaluate", get(handlers::system::evaluate))
        .route("/system/gpu-usage", get(handlers::system::gpu_usage))
        .route("/system/benchmark", get(handlers::system::benchmark))
        // Events (SSE)
        .route("/events", get(handlers::events::stream))
        // Prometheus metrics
        .route("/metrics", get(handlers::metrics::render))
}

/// Create the main Axum router with all API routes.
pub fn create_router(ctx: AxumContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes().with_state(state).layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Create a router serving API routes plus static frontend assets, with
/// an SPA fallback to `index.html` for unmatched paths.
pub fn create_spa_router<P: AsRef<Path>>(
    ctx: AxumContext,
    static_dir: P,
    cors_config: &CorsConfig,
) -> Router {
    let static_path = static_dir.as_ref();
    let index_path = static_path.join("index.html");
    let serve_dir = ServeDir::new(static_path).fallback(ServeFile::new(&index_path));

    create_router(ctx, cors_config).fallback_service(serve_dir)
}

pub(crate) async fn health_check() -> &'static str {
    "OK"
}

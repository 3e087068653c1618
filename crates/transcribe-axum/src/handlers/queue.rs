//! Queue handlers: snapshot, reorder, priority change, and the queue
//! WebSocket (initial snapshot + live event forwarding + keepalive).

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::interval;

use transcribe_core::events::AppEvent;
use transcribe_core::ports::EventBus;

use crate::dto::{PriorityRequest, QueueSnapshot, ReorderRequest};
use crate::error::HttpError;
use crate::state::AppState;

/// `GET /api/queue`
pub async fn snapshot(State(state): State<AppState>) -> Result<Json<QueueSnapshot>, HttpError> {
    let jobs = state.scheduler.snapshot(500).await?;
    Ok(Json(QueueSnapshot {
        admission_limit: state.scheduler.admission_limit(),
        in_flight: state.scheduler.in_flight(),
        jobs,
    }))
}

/// `POST /api/queue/reorder`
pub async fn reorder(State(state): State<AppState>, Json(request): Json<ReorderRequest>) -> Result<(), HttpError> {
    state.scheduler.reorder(&request.job_ids).await?;
    Ok(())
}

/// `POST /api/queue/{id}/priority`
pub async fn set_priority(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PriorityRequest>,
) -> Result<(), HttpError> {
    state.scheduler.set_priority(&id, request.priority).await?;
    Ok(())
}

/// `WS /api/queue/ws` — sends an initial snapshot, then forwards every
/// queue/progress event, with a 30s ping/pong keepalive.
pub async fn queue_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let Ok(jobs) = state.scheduler.snapshot(500).await else {
        return;
    };
    let snapshot = QueueSnapshot {
        admission_limit: state.scheduler.admission_limit(),
        in_flight: state.scheduler.in_flight(),
        jobs,
    };
    if let Ok(json) = serde_json::to_string(&snapshot) {
        if socket.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    let mut subscription = state.events.subscribe().await;
    let mut keepalive = interval(Duration::from_secs(30));
    keepalive.tick().await;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let Ok(json) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            _ = keepalive.tick() => {
                let Ok(json) = serde_json::to_string(&AppEvent::Ping) else { continue };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

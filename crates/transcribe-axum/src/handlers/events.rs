//! SSE events handler - real-time event streaming.
//!
//! Streams every [`transcribe_core::events::AppEvent`] to connected
//! clients: job progress, status transitions, queue reorders, and
//! model download progress.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::stream::Stream;

use crate::state::AppState;

/// SSE events stream endpoint.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    state.events.sse_stream()
}

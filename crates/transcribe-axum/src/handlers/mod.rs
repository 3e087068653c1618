//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for a specific API area, thin
//! wrappers delegating to the shared `AxumContext`.

pub mod batches;
pub mod events;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod queue;
pub mod stream;
pub mod system;

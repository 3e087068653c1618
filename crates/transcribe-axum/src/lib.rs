//! HTTP/WS/SSE facade for the transcription job engine.
//!
//! Wires the domain/port crates (`transcribe-core`, `transcribe-db`,
//! `transcribe-queue`, `transcribe-engines`, `transcribe-pipeline`) to
//! an Axum router. [`bootstrap::bootstrap`] is the composition root;
//! [`routes::create_router`] builds the router from its output.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use hyper as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sse;
pub mod state;

pub use bootstrap::{bootstrap, start_server, AxumContext, CorsConfig, ServerConfig};
pub use error::HttpError;
pub use routes::{create_router, create_spa_router};
pub use state::AppState;

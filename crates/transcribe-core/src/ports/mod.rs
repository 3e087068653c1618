//! Port traits — the seams between the domain core and infrastructure.
//!
//! Each port is an `async_trait` so implementations can be stored as
//! `Arc<dyn Trait + Send + Sync>` and passed around without generics
//! leaking into every call site.

pub mod engines;
pub mod event_bus;
pub mod store;
pub mod system_probe;

use std::sync::Arc;

use thiserror::Error;

pub use engines::{
    DiarizationAdapter, DiarizedSegment, EngineError, SttAdapter, SttInfo, SttSegment, TtsAdapter,
};
pub use event_bus::{EventBus, NoopEventBus, Subscription};
pub use store::{
    BatchRepository, Filter, JobRepository, ModelRepository, Order, Page, TranscriptRepository,
};
pub use system_probe::{GpuInfo, SystemMemoryInfo, SystemProbePort};

/// Errors surfaced by a repository implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Errors surfaced by an inference engine adapter. Aliased from
/// [`engines::EngineError`] so callers only need one error type in scope.
pub type AdapterError = EngineError;

/// The aggregate error type returned by core use-cases.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("resource missing: {0}")]
    ResourceMissing(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Bundles the repository trait objects a use-case needs, mirroring the
/// teacher's `Repos` aggregate so call sites take one argument instead of
/// four.
#[derive(Clone)]
pub struct Repos {
    pub jobs: Arc<dyn JobRepository>,
    pub batches: Arc<dyn BatchRepository>,
    pub transcripts: Arc<dyn TranscriptRepository>,
    pub models: Arc<dyn ModelRepository>,
}

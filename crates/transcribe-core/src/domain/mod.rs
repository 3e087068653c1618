//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (database, filesystem, scheduler, etc.).
//!
//! # Structure
//!
//! - `job` — `Job`, `NewJob`, `JobStatus`, `OutputFormat`
//! - `batch` — `JobBatch`, `BatchStatus`
//! - `transcript` — `Transcript`, `Segment`, `WordTiming`
//! - `model` — `Model`, `NewModel`, `DownloadStatus`
//! - `tts_output` — `TtsOutput`

pub mod batch;
pub mod job;
pub mod model;
pub mod transcript;
pub mod tts_output;

pub use batch::{BatchStatus, JobBatch};
pub use job::{Job, JobFeatures, JobModels, JobStatus, NewJob, OutputFormat};
pub use model::{DownloadStatus, Model, ModelCapabilities, ModelSource, ModelType, NewModel};
pub use transcript::{segments_well_formed, Segment, Transcript, WordTiming};
pub use tts_output::TtsOutput;

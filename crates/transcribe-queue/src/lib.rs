//! Scheduler and Model Registry/Downloader for the transcription job
//! engine.
//!
//! Neither owns persistence — both drive the `transcribe_core::ports`
//! traits implemented by `transcribe-db` and publish through the
//! `EventBus` port, same as the rest of the system.

pub mod models;
pub mod scheduler;

pub use models::{HttpModelFetcher, LocalModelFetcher, ModelFetcher, ModelRegistry};
pub use scheduler::{Scheduler, SchedulerConfig};

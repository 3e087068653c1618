//! Pure domain model and port traits for the transcription pipeline.
//!
//! This crate has no knowledge of HTTP, SQL, or any concrete inference
//! engine — those live behind the traits in [`ports`] and are wired up
//! by `transcribe-db`, `transcribe-queue`, `transcribe-engines`, and
//! `transcribe-axum`.

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;
pub mod utils;

pub use events::AppEvent;
pub use ports::{CoreError, RepositoryError};
pub use settings::{Settings, SettingsError, SettingsUpdate};

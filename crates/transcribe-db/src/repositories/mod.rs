//! Repository implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod row_mappers;
mod sqlite_batch_repository;
mod sqlite_job_repository;
mod sqlite_model_repository;
mod sqlite_transcript_repository;

pub use sqlite_batch_repository::SqliteBatchRepository;
pub use sqlite_job_repository::SqliteJobRepository;
pub use sqlite_model_repository::SqliteModelRepository;
pub use sqlite_transcript_repository::SqliteTranscriptRepository;

//! `SQLite`-backed implementations of the `transcribe_core::ports::store`
//! traits — the Store.

#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
mod retry;
pub mod setup;

pub use factory::StoreFactory;
pub use retry::transaction;

#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestDb;

pub use repositories::{
    SqliteBatchRepository, SqliteJobRepository, SqliteModelRepository, SqliteTranscriptRepository,
};

pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

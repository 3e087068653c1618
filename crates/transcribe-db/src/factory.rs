//! Composition utilities for building the `Store` from `SQLite` backends.
//!
//! This module is focused purely on construction and should not contain
//! any domain logic.

use std::sync::Arc;

use sqlx::SqlitePool;
use transcribe_core::ports::Repos;

use crate::repositories::{
    SqliteBatchRepository, SqliteJobRepository, SqliteModelRepository, SqliteTranscriptRepository,
};

/// Factory for creating repository instances with `SQLite` backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a `SQLite` connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn create_pool(db_url: &str) -> anyhow::Result<SqlitePool> {
        let pool = SqlitePool::connect(db_url).await?;
        Ok(pool)
    }

    /// Create an in-memory `SQLite` pool for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn create_test_pool() -> anyhow::Result<SqlitePool> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Ok(pool)
    }

    /// Build all `SQLite` repositories from a pool into the `Repos`
    /// aggregate the core ports expect.
    #[must_use]
    pub fn build_repos(pool: SqlitePool) -> Repos {
        Repos {
            jobs: Arc::new(SqliteJobRepository::new(pool.clone())),
            batches: Arc::new(SqliteBatchRepository::new(pool.clone())),
            transcripts: Arc::new(SqliteTranscriptRepository::new(pool.clone())),
            models: Arc::new(SqliteModelRepository::new(pool)),
        }
    }
}

/// Test database helper for integration tests: an in-memory `SQLite`
/// database with full schema already applied.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test database with full schema.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn repos(&self) -> Repos {
        StoreFactory::build_repos(self.pool.clone())
    }
}

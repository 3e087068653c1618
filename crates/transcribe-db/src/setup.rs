//! Database setup and initialization.
//!
//! This module provides the `setup_database()` function for initializing
//! the `SQLite` database with full schema. Entry points call this with the
//! resolved database path.

use anyhow::Result;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::path::Path;

/// Sets up the `SQLite` database connection and ensures the schema exists.
///
/// # Errors
///
/// Returns an error if the database file cannot be opened/created, or if
/// schema creation fails.
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true),
    )
    .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Sets up an in-memory `SQLite` database for testing.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete database schema.
///
/// Safe to call multiple times — all statements use `IF NOT EXISTS`.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            original_filename TEXT NOT NULL,
            input_path TEXT NOT NULL,
            source_language TEXT,
            translate_to TEXT,
            stt_model_id INTEGER,
            diarization_model_id INTEGER,
            tts_model_id INTEGER,
            diarize INTEGER NOT NULL DEFAULT 0,
            synthesize INTEGER NOT NULL DEFAULT 0,
            sync_tts_timing INTEGER NOT NULL DEFAULT 0,
            priority INTEGER NOT NULL DEFAULT 5,
            output_formats TEXT NOT NULL DEFAULT '["json"]',
            status TEXT NOT NULL DEFAULT 'queued',
            stage TEXT,
            progress INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT,
            error_message TEXT,
            output_dir TEXT NOT NULL,
            duration REAL,
            batch_id TEXT,
            FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_admission ON jobs(priority, created_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_batch ON jobs(batch_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            id TEXT PRIMARY KEY,
            total_files INTEGER NOT NULL,
            completed_files INTEGER NOT NULL DEFAULT 0,
            failed_files INTEGER NOT NULL DEFAULT 0,
            progress INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'processing',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcripts (
            job_id TEXT PRIMARY KEY,
            detected_language TEXT NOT NULL,
            duration REAL NOT NULL,
            word_count INTEGER NOT NULL DEFAULT 0,
            full_text TEXT NOT NULL DEFAULT '',
            speaker_count INTEGER NOT NULL DEFAULT 0,
            segments TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS models (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            model_type TEXT NOT NULL,
            engine TEXT NOT NULL,
            source TEXT NOT NULL,
            upstream_id TEXT NOT NULL,
            revision TEXT,
            size_bytes INTEGER,
            languages TEXT NOT NULL DEFAULT '[]',
            recommended_memory_gb REAL,
            is_default INTEGER NOT NULL DEFAULT 0,
            download_state TEXT NOT NULL DEFAULT 'absent',
            download_progress INTEGER,
            download_error TEXT,
            local_path TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_models_engine_upstream_id ON models(engine, upstream_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_models_type ON models(model_type)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn setup_test_database_creates_tables() {
        let pool = setup_test_database().await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM batches")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transcripts")
            .fetch_one(&pool)
            .await
            .unwrap();
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM models")
            .fetch_one(&pool)
            .await
            .unwrap();
    }
}

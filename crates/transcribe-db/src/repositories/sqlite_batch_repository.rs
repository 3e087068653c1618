//! `SQLite` implementation of the `BatchRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use transcribe_core::domain::JobBatch;
use transcribe_core::ports::store::{BatchMutator, BatchRepository, Page};
use transcribe_core::ports::RepositoryError;

use super::row_mappers::row_to_batch;

fn storage_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

const BATCH_SELECT_COLUMNS: &str =
    "id, total_files, completed_files, failed_files, progress, status, created_at";

pub struct SqliteBatchRepository {
    pool: SqlitePool,
}

impl SqliteBatchRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchRepository for SqliteBatchRepository {
    async fn create(&self, batch: JobBatch) -> Result<JobBatch, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO batches (id, total_files, completed_files, failed_files, progress, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&batch.id)
        .bind(i64::from(batch.total_files))
        .bind(i64::from(batch.completed_files))
        .bind(i64::from(batch.failed_files))
        .bind(i64::from(batch.progress))
        .bind(batch.status.as_str())
        .bind(batch.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        self.get(&batch.id).await
    }

    async fn get(&self, id: &str) -> Result<JobBatch, RepositoryError> {
        let query = format!("SELECT {BATCH_SELECT_COLUMNS} FROM batches WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "batch",
                id: id.to_string(),
            })?;
        row_to_batch(&row)
    }

    async fn update(&self, id: &str, mutator: BatchMutator<'_>) -> Result<JobBatch, RepositoryError> {
        let id = id.to_string();
        crate::retry::transaction(&self.pool, |conn| {
            let id = id.clone();
            Box::pin(async move {
                let query = format!("SELECT {BATCH_SELECT_COLUMNS} FROM batches WHERE id = ?");
                let row = sqlx::query(&query)
                    .bind(&id)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| RepositoryError::NotFound { kind: "batch", id: id.clone() })?;
                let current = row_to_batch(&row)?;
                let updated = mutator(current);

                let result = sqlx::query(
                    "UPDATE batches SET completed_files = ?, failed_files = ?, progress = ?, status = ? WHERE id = ?",
                )
                .bind(i64::from(updated.completed_files))
                .bind(i64::from(updated.failed_files))
                .bind(i64::from(updated.progress))
                .bind(updated.status.as_str())
                .bind(&updated.id)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound { kind: "batch", id: updated.id.clone() });
                }
                Ok(updated)
            })
        })
        .await
    }

    async fn list(&self, page: Page) -> Result<Vec<JobBatch>, RepositoryError> {
        let query = format!(
            "SELECT {BATCH_SELECT_COLUMNS} FROM batches ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&query)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_batch).collect()
    }
}

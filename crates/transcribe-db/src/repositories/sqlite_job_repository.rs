//! `SQLite` implementation of the `JobRepository` trait.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use transcribe_core::domain::{Job, NewJob};
use transcribe_core::ports::store::{Filter, JobMutator, JobRepository, Order, Page};
use transcribe_core::ports::RepositoryError;

use super::row_mappers::{row_to_job, JOB_SELECT_COLUMNS};

fn storage_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn create(&self, job: NewJob) -> Result<Job, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let output_formats_json =
            serde_json::to_string(&job.output_formats).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let created_at = Utc::now();

        sqlx::query(
            r#"INSERT INTO jobs (
                id, original_filename, input_path, source_language, translate_to,
                stt_model_id, diarization_model_id, tts_model_id,
                diarize, synthesize, sync_tts_timing,
                priority, output_formats, status, stage, progress,
                created_at, started_at, completed_at, error_message,
                output_dir, duration, batch_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'queued', NULL, 0, ?, NULL, NULL, NULL, ?, NULL, ?)"#,
        )
        .bind(&id)
        .bind(&job.original_filename)
        .bind(&job.input_path)
        .bind(&job.source_language)
        .bind(&job.translate_to)
        .bind(job.models.stt_model_id)
        .bind(job.models.diarization_model_id)
        .bind(job.models.tts_model_id)
        .bind(job.features.diarize)
        .bind(job.features.synthesize)
        .bind(job.features.sync_tts_timing)
        .bind(i64::from(job.priority))
        .bind(&output_formats_json)
        .bind(created_at)
        .bind(&job.output_dir)
        .bind(&job.batch_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        self.get(&id).await
    }

    async fn get(&self, id: &str) -> Result<Job, RepositoryError> {
        let query = format!("SELECT {JOB_SELECT_COLUMNS} FROM jobs WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "job",
                id: id.to_string(),
            })?;
        row_to_job(&row)
    }

    async fn update(&self, id: &str, mutator: JobMutator<'_>) -> Result<Job, RepositoryError> {
        let id = id.to_string();
        crate::retry::transaction(&self.pool, |conn| {
            let id = id.clone();
            Box::pin(async move {
                let query = format!("SELECT {JOB_SELECT_COLUMNS} FROM jobs WHERE id = ?");
                let row = sqlx::query(&query)
                    .bind(&id)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| RepositoryError::NotFound { kind: "job", id: id.clone() })?;
                let current = row_to_job(&row)?;
                let updated = mutator(current);

                let output_formats_json = serde_json::to_string(&updated.output_formats)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

                let result = sqlx::query(
                    r#"UPDATE jobs SET
                        source_language = ?, translate_to = ?,
                        stt_model_id = ?, diarization_model_id = ?, tts_model_id = ?,
                        diarize = ?, synthesize = ?, sync_tts_timing = ?,
                        priority = ?, output_formats = ?, status = ?, stage = ?, progress = ?,
                        started_at = ?, completed_at = ?, error_message = ?, duration = ?
                    WHERE id = ?"#,
                )
                .bind(&updated.source_language)
                .bind(&updated.translate_to)
                .bind(updated.models.stt_model_id)
                .bind(updated.models.diarization_model_id)
                .bind(updated.models.tts_model_id)
                .bind(updated.features.diarize)
                .bind(updated.features.synthesize)
                .bind(updated.features.sync_tts_timing)
                .bind(i64::from(updated.priority))
                .bind(&output_formats_json)
                .bind(updated.status.as_str())
                .bind(&updated.stage)
                .bind(i64::from(updated.progress))
                .bind(updated.started_at)
                .bind(updated.completed_at)
                .bind(&updated.error_message)
                .bind(updated.duration)
                .bind(&updated.id)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound { kind: "job", id: updated.id.clone() });
                }
                Ok(updated)
            })
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                kind: "job",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: Filter,
        order: Order,
        page: Page,
    ) -> Result<Vec<Job>, RepositoryError> {
        let mut query = format!("SELECT {JOB_SELECT_COLUMNS} FROM jobs WHERE 1=1");
        if filter.status.is_some() {
            query.push_str(" AND status = ?");
        }
        if filter.batch_id.is_some() {
            query.push_str(" AND batch_id = ?");
        }
        query.push_str(match order {
            Order::Admission => " ORDER BY priority ASC, created_at ASC",
            Order::CreatedAtDesc => " ORDER BY created_at DESC",
        });
        query.push_str(" LIMIT ? OFFSET ?");

        let mut q = sqlx::query(&query);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(batch_id) = &filter.batch_id {
            q = q.bind(batch_id);
        }
        q = q.bind(i64::from(page.limit)).bind(i64::from(page.offset));

        let rows = q.fetch_all(&self.pool).await.map_err(storage_err)?;
        rows.iter().map(row_to_job).collect()
    }

    async fn list_admissible(&self) -> Result<Vec<Job>, RepositoryError> {
        let query = format!(
            "SELECT {JOB_SELECT_COLUMNS} FROM jobs WHERE status IN ('pending', 'queued') \
             ORDER BY priority ASC, created_at ASC"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_job).collect()
    }

    async fn count_by_status(&self, status: transcribe_core::domain::JobStatus) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.0 as u64)
    }

    async fn count_completed_last_hour(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE status = 'completed' \
             AND completed_at >= datetime('now', '-1 hour')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.0 as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use transcribe_core::domain::{JobFeatures, JobModels, OutputFormat};

    fn new_job() -> NewJob {
        NewJob {
            original_filename: "a.wav".into(),
            input_path: "/tmp/a.wav".into(),
            source_language: None,
            translate_to: None,
            models: JobModels::default(),
            features: JobFeatures::default(),
            priority: 5,
            output_formats: vec![OutputFormat::Json],
            output_dir: "/tmp/out/a".into(),
            batch_id: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteJobRepository::new(pool);
        let created = repo.create(new_job()).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(created.id, fetched.id);
        assert_eq!(fetched.priority, 5);
    }

    #[tokio::test]
    async fn list_admissible_orders_by_priority_then_created_at() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteJobRepository::new(pool);
        let mut low = new_job();
        low.priority = 8;
        let low = repo.create(low).await.unwrap();
        let mut high = new_job();
        high.priority = 1;
        let high = repo.create(high).await.unwrap();

        let admissible = repo.list_admissible().await.unwrap();
        assert_eq!(admissible[0].id, high.id);
        assert_eq!(admissible[1].id, low.id);
    }

    #[tokio::test]
    async fn get_missing_job_errors_not_found() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteJobRepository::new(pool);
        assert!(matches!(
            repo.get("nope").await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_applies_mutator_to_the_current_row() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteJobRepository::new(pool);
        let created = repo.create(new_job()).await.unwrap();

        let bump = |mut job: Job| {
            job.progress = job.progress.max(42);
            job
        };
        let updated = repo.update(&created.id, &bump).await.unwrap();
        assert_eq!(updated.progress, 42);

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched.progress, 42);
    }

    #[tokio::test]
    async fn update_missing_job_errors_not_found() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteJobRepository::new(pool);
        let identity = |job: Job| job;
        assert!(matches!(
            repo.update("nope", &identity).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}

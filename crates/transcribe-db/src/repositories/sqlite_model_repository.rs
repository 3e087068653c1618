//! `SQLite` implementation of the `ModelRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use transcribe_core::domain::{DownloadStatus, Model, NewModel};
use transcribe_core::ports::store::{ModelMutator, ModelRepository};
use transcribe_core::ports::RepositoryError;

use super::row_mappers::{row_to_model, MODEL_SELECT_COLUMNS};

fn storage_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn download_state_columns(status: &DownloadStatus) -> (&'static str, Option<i64>, Option<&str>) {
    match status {
        DownloadStatus::Absent => ("absent", None, None),
        DownloadStatus::Downloading { progress } => ("downloading", Some(i64::from(*progress)), None),
        DownloadStatus::Present => ("present", None, None),
        DownloadStatus::Error { message } => ("error", None, Some(message.as_str())),
    }
}

pub struct SqliteModelRepository {
    pool: SqlitePool,
}

impl SqliteModelRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModelRepository for SqliteModelRepository {
    async fn create(&self, model: NewModel) -> Result<Model, RepositoryError> {
        let languages_json = serde_json::to_string(&model.capabilities.languages)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO models (
                name, model_type, engine, source, upstream_id, revision,
                size_bytes, languages, recommended_memory_gb, is_default,
                download_state, download_progress, download_error, local_path
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'absent', NULL, NULL, NULL)
            ON CONFLICT(engine, upstream_id) DO UPDATE SET
                name = excluded.name,
                revision = excluded.revision,
                size_bytes = excluded.size_bytes,
                languages = excluded.languages,
                recommended_memory_gb = excluded.recommended_memory_gb"#,
        )
        .bind(&model.name)
        .bind(model_type_str(model.model_type))
        .bind(&model.engine)
        .bind(model_source_str(model.source))
        .bind(&model.upstream_id)
        .bind(&model.revision)
        .bind(model.capabilities.size_bytes.map(|v| v as i64))
        .bind(&languages_json)
        .bind(model.capabilities.recommended_memory_gb)
        .bind(model.is_default)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        // Re-fetch by (engine, upstream_id) rather than `last_insert_rowid()`,
        // which is unreliable across the upsert's insert-vs-update paths.
        self.get_by_upstream_id(&model.engine, &model.upstream_id).await
    }

    async fn get(&self, id: i64) -> Result<Model, RepositoryError> {
        let query = format!("SELECT {MODEL_SELECT_COLUMNS} FROM models WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "model",
                id: id.to_string(),
            })?;
        row_to_model(&row)
    }

    async fn get_by_upstream_id(&self, engine: &str, upstream_id: &str) -> Result<Model, RepositoryError> {
        let query = format!("SELECT {MODEL_SELECT_COLUMNS} FROM models WHERE engine = ? AND upstream_id = ?");
        let row = sqlx::query(&query)
            .bind(engine)
            .bind(upstream_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "model",
                id: upstream_id.to_string(),
            })?;
        row_to_model(&row)
    }

    async fn update(&self, id: i64, mutator: ModelMutator<'_>) -> Result<Model, RepositoryError> {
        crate::retry::transaction(&self.pool, |conn| {
            Box::pin(async move {
                let query = format!("SELECT {MODEL_SELECT_COLUMNS} FROM models WHERE id = ?");
                let row = sqlx::query(&query)
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(storage_err)?
                    .ok_or_else(|| RepositoryError::NotFound { kind: "model", id: id.to_string() })?;
                let current = row_to_model(&row)?;
                let updated = mutator(current);

                let (state, progress, error) = download_state_columns(&updated.download_status);
                let languages_json = serde_json::to_string(&updated.capabilities.languages)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

                let result = sqlx::query(
                    r#"UPDATE models SET
                        name = ?, revision = ?, size_bytes = ?, languages = ?, recommended_memory_gb = ?,
                        is_default = ?, download_state = ?, download_progress = ?, download_error = ?,
                        local_path = ?
                    WHERE id = ?"#,
                )
                .bind(&updated.name)
                .bind(&updated.revision)
                .bind(updated.capabilities.size_bytes.map(|v| v as i64))
                .bind(&languages_json)
                .bind(updated.capabilities.recommended_memory_gb)
                .bind(updated.is_default)
                .bind(state)
                .bind(progress)
                .bind(error)
                .bind(&updated.local_path)
                .bind(updated.id)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound { kind: "model", id: updated.id.to_string() });
                }
                Ok(updated)
            })
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM models WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                kind: "model",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Model>, RepositoryError> {
        let query = format!("SELECT {MODEL_SELECT_COLUMNS} FROM models ORDER BY name ASC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_model).collect()
    }

    async fn count_present(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM models WHERE download_state = 'present'")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.0 as u64)
    }
}

fn model_type_str(t: transcribe_core::domain::ModelType) -> &'static str {
    use transcribe_core::domain::ModelType;
    match t {
        ModelType::Stt => "stt",
        ModelType::Diarization => "diarization",
        ModelType::Tts => "tts",
    }
}

fn model_source_str(s: transcribe_core::domain::ModelSource) -> &'static str {
    use transcribe_core::domain::ModelSource;
    match s {
        ModelSource::Registry => "registry",
        ModelSource::Local => "local",
        ModelSource::Url => "url",
        ModelSource::Builtin => "builtin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use transcribe_core::domain::{ModelCapabilities, ModelSource, ModelType};

    fn new_model() -> NewModel {
        NewModel {
            name: "whisper-base".into(),
            model_type: ModelType::Stt,
            engine: "whisper.cpp".into(),
            source: ModelSource::Registry,
            upstream_id: "ggml-org/whisper-base".into(),
            revision: None,
            capabilities: ModelCapabilities::default(),
            is_default: true,
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_on_engine_and_upstream_id() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteModelRepository::new(pool);
        let first = repo.create(new_model()).await.unwrap();
        let second = repo.create(new_model()).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn same_upstream_id_under_different_engines_are_distinct_rows() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteModelRepository::new(pool);
        let mut other_engine = new_model();
        other_engine.engine = "onnx".into();

        let first = repo.create(new_model()).await.unwrap();
        let second = repo.create(other_engine).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn update_persists_download_state() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteModelRepository::new(pool);
        let model = repo.create(new_model()).await.unwrap();

        let mark_present = |mut model: Model| {
            model.download_status = DownloadStatus::Present;
            model.local_path = Some("/models/whisper-base.bin".into());
            model
        };
        repo.update(model.id, &mark_present).await.unwrap();

        let fetched = repo.get(model.id).await.unwrap();
        assert!(fetched.download_status.is_present());
        assert_eq!(fetched.local_path.as_deref(), Some("/models/whisper-base.bin"));
    }

    #[tokio::test]
    async fn update_missing_model_errors_not_found() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteModelRepository::new(pool);
        let identity = |model: Model| model;
        assert!(matches!(
            repo.update(9999, &identity).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}

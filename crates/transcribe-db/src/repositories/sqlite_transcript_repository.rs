//! `SQLite` implementation of the `TranscriptRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use transcribe_core::domain::Transcript;
use transcribe_core::ports::store::TranscriptRepository;
use transcribe_core::ports::RepositoryError;

use super::row_mappers::row_to_transcript;

fn storage_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

const TRANSCRIPT_SELECT_COLUMNS: &str =
    "job_id, detected_language, duration, word_count, full_text, speaker_count, segments";

pub struct SqliteTranscriptRepository {
    pool: SqlitePool,
}

impl SqliteTranscriptRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranscriptRepository for SqliteTranscriptRepository {
    async fn put(&self, transcript: Transcript) -> Result<(), RepositoryError> {
        let segments_json = serde_json::to_string(&transcript.segments)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO transcripts (
                job_id, detected_language, duration, word_count, full_text, speaker_count, segments
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                detected_language = excluded.detected_language,
                duration = excluded.duration,
                word_count = excluded.word_count,
                full_text = excluded.full_text,
                speaker_count = excluded.speaker_count,
                segments = excluded.segments"#,
        )
        .bind(&transcript.job_id)
        .bind(&transcript.detected_language)
        .bind(transcript.duration)
        .bind(i64::from(transcript.word_count))
        .bind(&transcript.full_text)
        .bind(i64::from(transcript.speaker_count))
        .bind(&segments_json)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Transcript, RepositoryError> {
        let query = format!("SELECT {TRANSCRIPT_SELECT_COLUMNS} FROM transcripts WHERE job_id = ?");
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "transcript",
                id: job_id.to_string(),
            })?;
        row_to_transcript(&row)
    }

    async fn delete(&self, job_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM transcripts WHERE job_id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                kind: "transcript",
                id: job_id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use crate::repositories::SqliteJobRepository;
    use transcribe_core::domain::{JobFeatures, JobModels, NewJob, OutputFormat};
    use transcribe_core::ports::store::JobRepository;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let pool = setup_test_database().await.unwrap();
        let jobs = SqliteJobRepository::new(pool.clone());
        let job = jobs
            .create(NewJob {
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
            })
            .await
            .unwrap();

        let repo = SqliteTranscriptRepository::new(pool);
        let transcript = Transcript {
            job_id: job.id.clone(),
            detected_language: "en".into(),
            duration: 12.5,
            word_count: 3,
            full_text: "hello there world".into(),
            speaker_count: 1,
            segments: vec![],
        };
        repo.put(transcript.clone()).await.unwrap();
        let fetched = repo.get(&job.id).await.unwrap();
        assert_eq!(fetched.full_text, transcript.full_text);
    }
}

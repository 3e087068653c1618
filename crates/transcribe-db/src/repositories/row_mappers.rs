//! Row mapping helpers for `SQLite` queries.

use chrono::{DateTime, Utc};
use sqlx::Row;
use transcribe_core::domain::{
    BatchStatus, DownloadStatus, Job, JobBatch, JobFeatures, JobModels, JobStatus, Model,
    ModelCapabilities, ModelSource, ModelType, OutputFormat, Segment, Transcript,
};
use transcribe_core::ports::RepositoryError;

pub const JOB_SELECT_COLUMNS: &str = "id, original_filename, input_path, source_language, \
    translate_to, stt_model_id, diarization_model_id, tts_model_id, diarize, synthesize, \
    sync_tts_timing, priority, output_formats, status, stage, progress, created_at, \
    started_at, completed_at, error_message, output_dir, duration, batch_id";

pub const MODEL_SELECT_COLUMNS: &str = "id, name, model_type, engine, source, upstream_id, \
    revision, size_bytes, languages, recommended_memory_gb, is_default, download_state, \
    download_progress, download_error, local_path";

fn storage_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn serde_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Serialization(e.to_string())
}

pub fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job, RepositoryError> {
    let output_formats_json: String = row.try_get("output_formats").map_err(storage_err)?;
    let output_formats: Vec<OutputFormat> =
        serde_json::from_str(&output_formats_json).map_err(serde_err)?;
    let status_str: String = row.try_get("status").map_err(storage_err)?;
    let status = JobStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Storage(format!("unknown job status: {status_str}")))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(storage_err)?;

    Ok(Job {
        id: row.try_get("id").map_err(storage_err)?,
        original_filename: row.try_get("original_filename").map_err(storage_err)?,
        input_path: row.try_get("input_path").map_err(storage_err)?,
        source_language: row.try_get("source_language").map_err(storage_err)?,
        translate_to: row.try_get("translate_to").map_err(storage_err)?,
        models: JobModels {
            stt_model_id: row.try_get("stt_model_id").map_err(storage_err)?,
            diarization_model_id: row.try_get("diarization_model_id").map_err(storage_err)?,
            tts_model_id: row.try_get("tts_model_id").map_err(storage_err)?,
        },
        features: JobFeatures {
            diarize: row.try_get("diarize").map_err(storage_err)?,
            synthesize: row.try_get("synthesize").map_err(storage_err)?,
            sync_tts_timing: row.try_get("sync_tts_timing").map_err(storage_err)?,
        },
        priority: row.try_get::<i64, _>("priority").map_err(storage_err)? as u8,
        output_formats,
        status,
        stage: row.try_get("stage").map_err(storage_err)?,
        progress: row.try_get::<i64, _>("progress").map_err(storage_err)? as u8,
        created_at,
        started_at: row.try_get("started_at").map_err(storage_err)?,
        completed_at: row.try_get("completed_at").map_err(storage_err)?,
        error_message: row.try_get("error_message").map_err(storage_err)?,
        output_dir: row.try_get("output_dir").map_err(storage_err)?,
        duration: row.try_get("duration").map_err(storage_err)?,
        batch_id: row.try_get("batch_id").map_err(storage_err)?,
        queue_position: None,
    })
}

pub fn row_to_batch(row: &sqlx::sqlite::SqliteRow) -> Result<JobBatch, RepositoryError> {
    let status_str: String = row.try_get("status").map_err(storage_err)?;
    let status = BatchStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Storage(format!("unknown batch status: {status_str}")))?;

    Ok(JobBatch {
        id: row.try_get("id").map_err(storage_err)?,
        total_files: row.try_get::<i64, _>("total_files").map_err(storage_err)? as u32,
        completed_files: row
            .try_get::<i64, _>("completed_files")
            .map_err(storage_err)? as u32,
        failed_files: row.try_get::<i64, _>("failed_files").map_err(storage_err)? as u32,
        progress: row.try_get::<i64, _>("progress").map_err(storage_err)? as u8,
        status,
        created_at: row.try_get("created_at").map_err(storage_err)?,
    })
}

pub fn row_to_transcript(row: &sqlx::sqlite::SqliteRow) -> Result<Transcript, RepositoryError> {
    let segments_json: String = row.try_get("segments").map_err(storage_err)?;
    let segments: Vec<Segment> = serde_json::from_str(&segments_json).map_err(serde_err)?;

    Ok(Transcript {
        job_id: row.try_get("job_id").map_err(storage_err)?,
        detected_language: row.try_get("detected_language").map_err(storage_err)?,
        duration: row.try_get("duration").map_err(storage_err)?,
        word_count: row.try_get::<i64, _>("word_count").map_err(storage_err)? as u32,
        full_text: row.try_get("full_text").map_err(storage_err)?,
        speaker_count: row.try_get::<i64, _>("speaker_count").map_err(storage_err)? as u32,
        segments,
    })
}

pub fn row_to_model(row: &sqlx::sqlite::SqliteRow) -> Result<Model, RepositoryError> {
    let model_type_str: String = row.try_get("model_type").map_err(storage_err)?;
    let model_type = match model_type_str.as_str() {
        "stt" => ModelType::Stt,
        "diarization" => ModelType::Diarization,
        "tts" => ModelType::Tts,
        other => return Err(RepositoryError::Storage(format!("unknown model type: {other}"))),
    };

    let source_str: String = row.try_get("source").map_err(storage_err)?;
    let source = match source_str.as_str() {
        "registry" => ModelSource::Registry,
        "local" => ModelSource::Local,
        "url" => ModelSource::Url,
        "builtin" => ModelSource::Builtin,
        other => return Err(RepositoryError::Storage(format!("unknown model source: {other}"))),
    };

    let languages_json: String = row.try_get("languages").map_err(storage_err)?;
    let languages: Vec<String> = serde_json::from_str(&languages_json).unwrap_or_default();

    let download_state: String = row.try_get("download_state").map_err(storage_err)?;
    let download_status = match download_state.as_str() {
        "absent" => DownloadStatus::Absent,
        "downloading" => DownloadStatus::Downloading {
            progress: row
                .try_get::<i64, _>("download_progress")
                .map_err(storage_err)? as u8,
        },
        "present" => DownloadStatus::Present,
        "error" => DownloadStatus::Error {
            message: row
                .try_get::<Option<String>, _>("download_error")
                .map_err(storage_err)?
                .unwrap_or_default(),
        },
        other => {
            return Err(RepositoryError::Storage(format!(
                "unknown download state: {other}"
            )))
        }
    };

    Ok(Model {
        id: row.try_get("id").map_err(storage_err)?,
        name: row.try_get("name").map_err(storage_err)?,
        model_type,
        engine: row.try_get("engine").map_err(storage_err)?,
        source,
        upstream_id: row.try_get("upstream_id").map_err(storage_err)?,
        revision: row.try_get("revision").map_err(storage_err)?,
        capabilities: ModelCapabilities {
            size_bytes: row
                .try_get::<Option<i64>, _>("size_bytes")
                .map_err(storage_err)?
                .map(|v| v as u64),
            languages,
            recommended_memory_gb: row
                .try_get("recommended_memory_gb")
                .map_err(storage_err)?,
        },
        is_default: row.try_get("is_default").map_err(storage_err)?,
        download_status,
        local_path: row.try_get("local_path").map_err(storage_err)?,
    })
}

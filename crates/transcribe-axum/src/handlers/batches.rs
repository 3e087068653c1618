//! Batch handlers: multipart create (>=2 files), get, cascade delete,
//! ZIP export of completed members' artifacts.

use std::io::Write;

use axum::extract::multipart::Multipart;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use transcribe_core::domain::{BatchStatus, JobBatch, JobFeatures, JobModels, JobStatus, NewJob, OutputFormat};
use transcribe_core::ports::store::{Filter, Order, Page};

use crate::dto::ExportQuery;
use crate::error::HttpError;
use crate::state::AppState;

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

struct ParsedBatch {
    files: Vec<UploadedFile>,
    source_language: Option<String>,
    translate_to: Option<String>,
    features: JobFeatures,
    priority: u8,
    output_formats: Vec<OutputFormat>,
}

async fn parse_batch(mut multipart: Multipart) -> Result<ParsedBatch, HttpError> {
    let mut files = Vec::new();
    let mut source_language = None;
    let mut translate_to = None;
    let mut features = JobFeatures::default();
    let mut priority = 5u8;
    let mut output_formats = vec![OutputFormat::Json];

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::BadRequest(format!("failed reading upload: {e}")))?
                    .to_vec();
                files.push(UploadedFile { filename, bytes });
            }
            "source_language" => {
                let value = field.text().await.unwrap_or_default();
                source_language = (value != "auto" && !value.is_empty()).then_some(value);
            }
            "translate_to" => {
                let value = field.text().await.unwrap_or_default();
                translate_to = (!value.is_empty()).then_some(value);
            }
            "diarize" => features.diarize = field.text().await.unwrap_or_default() == "true",
            "synthesize" => features.synthesize = field.text().await.unwrap_or_default() == "true",
            "sync_tts_timing" => features.sync_tts_timing = field.text().await.unwrap_or_default() == "true",
            "priority" => {
                priority = field
                    .text()
                    .await
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5);
            }
            "output_formats" => {
                let value = field.text().await.unwrap_or_default();
                let parsed: Vec<OutputFormat> = value.split(',').filter_map(|s| OutputFormat::parse(s.trim())).collect();
                if !parsed.is_empty() {
                    output_formats = parsed;
                }
            }
            _ => {}
        }
    }

    if files.len() < 2 {
        return Err(HttpError::BadRequest("a batch requires at least 2 files".to_string()));
    }

    Ok(ParsedBatch {
        files,
        source_language,
        translate_to,
        features,
        priority: NewJob::clamp_priority(priority),
        output_formats,
    })
}

/// `POST /api/batches` — jobs inherit the batch's common settings.
pub async fn create(State(state): State<AppState>, multipart: Multipart) -> Result<Json<JobBatch>, HttpError> {
    let parsed = parse_batch(multipart).await?;
    let batch_id = Uuid::new_v4().to_string();
    let total_files = parsed.files.len() as u32;

    let batch = JobBatch {
        id: batch_id.clone(),
        total_files,
        completed_files: 0,
        failed_files: 0,
        progress: 0,
        status: BatchStatus::Processing,
        created_at: Utc::now(),
    };
    let batch = state.repos.batches.create(batch).await?;

    let (uploads_dir, outputs_dir) = {
        let settings = state.settings.read().await;
        (settings.uploads_dir.clone(), settings.outputs_dir.clone())
    };

    for file in parsed.files {
        let upload_id = Uuid::new_v4().to_string();
        let input_dir = uploads_dir.join(&batch_id).join(&upload_id);
        tokio::fs::create_dir_all(&input_dir)
            .await
            .map_err(|e| HttpError::Internal(format!("failed to create upload dir: {e}")))?;
        let input_path = input_dir.join(&file.filename);
        tokio::fs::write(&input_path, &file.bytes)
            .await
            .map_err(|e| HttpError::Internal(format!("failed to persist upload: {e}")))?;

        let new_job = NewJob {
            original_filename: file.filename,
            input_path: input_path.to_string_lossy().into_owned(),
            source_language: parsed.source_language.clone(),
            translate_to: parsed.translate_to.clone(),
            models: JobModels::default(),
            features: parsed.features,
            priority: parsed.priority,
            output_formats: parsed.output_formats.clone(),
            output_dir: outputs_dir.join(&upload_id).to_string_lossy().into_owned(),
            batch_id: Some(batch_id.clone()),
        };
        state.scheduler.enqueue(new_job).await?;
    }

    Ok(Json(batch))
}

/// `GET /api/batches/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<JobBatch>, HttpError> {
    Ok(Json(state.repos.batches.get(&id).await?))
}

/// `DELETE /api/batches/{id}` — cascades to every member job.
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), HttpError> {
    let _ = state.repos.batches.get(&id).await?;
    let members = state
        .repos
        .jobs
        .list(Filter::by_batch(id.clone()), Order::CreatedAtDesc, Page::first(10_000))
        .await?;

    for job in members {
        if job.status.is_terminal() {
            let _ = state.repos.transcripts.delete(&job.id).await;
            let _ = tokio::fs::remove_dir_all(&job.output_dir).await;
            state.repos.jobs.delete(&job.id).await?;
        } else {
            state.scheduler.cancel(&job.id).await?;
            state.executor.request_cancel(&job.id).await;
        }
    }
    Ok(())
}

/// `GET /api/batches/{id}/export?format=...` — ZIP of completed
/// members' rendered transcripts.
pub async fn export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, HttpError> {
    let _ = state.repos.batches.get(&id).await?;
    let format = query.format.unwrap_or(OutputFormat::Txt);
    let members = state
        .repos
        .jobs
        .list(Filter::by_batch(id.clone()), Order::CreatedAtDesc, Page::first(10_000))
        .await?;

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        for job in members.iter().filter(|j| j.status == JobStatus::Completed) {
            let Ok(transcript) = state.repos.transcripts.get(&job.id).await else {
                continue;
            };
            let Ok(rendered) = transcribe_pipeline::render(&transcript, format) else {
                continue;
            };
            let entry_name = format!("{}.{}", job.id, format.as_str());
            writer
                .start_file(entry_name, options)
                .map_err(|e| HttpError::Internal(format!("zip write failed: {e}")))?;
            writer
                .write_all(rendered.as_bytes())
                .map_err(|e| HttpError::Internal(format!("zip write failed: {e}")))?;
        }
        writer
            .finish()
            .map_err(|e| HttpError::Internal(format!("zip finalize failed: {e}")))?;
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"batch-{id}.zip\""),
            ),
        ],
        buf.into_inner(),
    )
        .into_response())
}

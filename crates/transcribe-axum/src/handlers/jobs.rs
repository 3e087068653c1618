//! Job handlers: create (multipart upload), list, get, delete,
//! transcript export, speaker remap.

use axum::extract::multipart::Multipart;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use transcribe_core::domain::{Job, JobFeatures, JobModels, JobStatus, NewJob, OutputFormat};
use transcribe_core::ports::store::{Filter, Order, Page};

use crate::dto::{SpeakerRemapRequest, TranscriptQuery};
use crate::error::HttpError;
use crate::state::AppState;

struct ParsedUpload {
    filename: String,
    bytes: Vec<u8>,
    source_language: Option<String>,
    translate_to: Option<String>,
    features: JobFeatures,
    priority: u8,
    output_formats: Vec<OutputFormat>,
    stt_model_id: Option<i64>,
    diarization_model_id: Option<i64>,
    tts_model_id: Option<i64>,
}

async fn parse_upload(mut multipart: Multipart) -> Result<ParsedUpload, HttpError> {
    let mut filename = None;
    let mut bytes = None;
    let mut source_language = None;
    let mut translate_to = None;
    let mut features = JobFeatures::default();
    let mut priority = 5u8;
    let mut output_formats = vec![OutputFormat::Json];
    let mut stt_model_id = None;
    let mut diarization_model_id = None;
    let mut tts_model_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                filename = Some(field.file_name().unwrap_or("upload.bin").to_string());
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| HttpError::BadRequest(format!("failed reading upload: {e}")))?
                        .to_vec(),
                );
            }
            "source_language" => source_language = Some(text(field).await?).filter(|s| s != "auto"),
            "translate_to" => translate_to = non_empty(text(field).await?),
            "diarize" => features.diarize = parse_bool(&text(field).await?),
            "synthesize" => features.synthesize = parse_bool(&text(field).await?),
            "sync_tts_timing" => features.sync_tts_timing = parse_bool(&text(field).await?),
            "priority" => {
                priority = text(field)
                    .await?
                    .parse::<u8>()
                    .map_err(|_| HttpError::BadRequest("priority must be an integer".to_string()))?;
            }
            "output_formats" => {
                output_formats = text(field)
                    .await?
                    .split(',')
                    .filter_map(|s| OutputFormat::parse(s.trim()))
                    .collect();
            }
            "stt_model_id" => stt_model_id = parse_opt_i64(&text(field).await?)?,
            "diarization_model_id" => diarization_model_id = parse_opt_i64(&text(field).await?)?,
            "tts_model_id" => tts_model_id = parse_opt_i64(&text(field).await?)?,
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| HttpError::BadRequest("missing file field".to_string()))?;
    let bytes = bytes.ok_or_else(|| HttpError::BadRequest("missing file field".to_string()))?;
    if output_formats.is_empty() {
        output_formats = vec![OutputFormat::Json];
    }

    Ok(ParsedUpload {
        filename,
        bytes,
        source_language,
        translate_to,
        features,
        priority: NewJob::clamp_priority(priority),
        output_formats,
        stt_model_id,
        diarization_model_id,
        tts_model_id,
    })
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, HttpError> {
    field
        .text()
        .await
        .map_err(|e| HttpError::BadRequest(format!("invalid field: {e}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s, "true" | "1" | "on" | "yes")
}

fn parse_opt_i64(s: &str) -> Result<Option<i64>, HttpError> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<i64>()
        .map(Some)
        .map_err(|_| HttpError::BadRequest("model id must be an integer".to_string()))
}

/// `POST /api/jobs` — persist the upload, enqueue with the scheduler.
pub async fn create(State(state): State<AppState>, multipart: Multipart) -> Result<Json<Job>, HttpError> {
    let upload = parse_upload(multipart).await?;

    let upload_id = Uuid::new_v4().to_string();
    let (uploads_dir, outputs_dir) = {
        let settings = state.settings.read().await;
        (settings.uploads_dir.clone(), settings.outputs_dir.clone())
    };
    let output_dir = outputs_dir.join(&upload_id).to_string_lossy().into_owned();

    let input_dir = uploads_dir.join(&upload_id);
    tokio::fs::create_dir_all(&input_dir)
        .await
        .map_err(|e| HttpError::Internal(format!("failed to create upload dir: {e}")))?;
    let input_path = input_dir.join(&upload.filename);
    tokio::fs::write(&input_path, &upload.bytes)
        .await
        .map_err(|e| HttpError::Internal(format!("failed to persist upload: {e}")))?;

    let new_job = NewJob {
        original_filename: upload.filename,
        input_path: input_path.to_string_lossy().into_owned(),
        source_language: upload.source_language,
        translate_to: upload.translate_to,
        models: JobModels {
            stt_model_id: upload.stt_model_id,
            diarization_model_id: upload.diarization_model_id,
            tts_model_id: upload.tts_model_id,
        },
        features: upload.features,
        priority: upload.priority,
        output_formats: upload.output_formats,
        output_dir,
        batch_id: None,
    };

    let job = state.scheduler.enqueue(new_job).await?;
    Ok(Json(job))
}

#[derive(Debug, serde::Deserialize)]
pub struct ListQuery {
    pub status: Option<JobStatus>,
}

/// `GET /api/jobs`
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Result<Json<Vec<Job>>, HttpError> {
    let filter = query.status.map(Filter::by_status).unwrap_or_default();
    let jobs = state
        .repos
        .jobs
        .list(filter, Order::CreatedAtDesc, Page::first(500))
        .await?;
    Ok(Json(jobs))
}

/// `GET /api/jobs/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Job>, HttpError> {
    Ok(Json(state.repos.jobs.get(&id).await?))
}

/// `DELETE /api/jobs/{id}` — cancel if live, delete otherwise.
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), HttpError> {
    let job = state.repos.jobs.get(&id).await?;
    if job.status.is_terminal() {
        let _ = state.repos.transcripts.delete(&id).await;
        let _ = tokio::fs::remove_dir_all(&job.output_dir).await;
        state.repos.jobs.delete(&id).await?;
    } else {
        state.scheduler.cancel(&id).await?;
        state.executor.request_cancel(&id).await;
    }
    Ok(())
}

/// `GET /api/jobs/{id}/transcript?format=...`
pub async fn transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Response, HttpError> {
    let job = state.repos.jobs.get(&id).await?;
    if job.status != JobStatus::Completed {
        return Err(HttpError::BadRequest(format!(
            "job {id} is not completed (status: {:?})",
            job.status
        )));
    }

    let transcript = state.repos.transcripts.get(&id).await?;
    let format = query.format.unwrap_or(OutputFormat::Json);
    let body = transcribe_pipeline::render(&transcript, format)
        .map_err(|e| HttpError::Internal(format!("failed to render transcript: {e}")))?;

    let content_type = match format {
        OutputFormat::Json => "application/json",
        OutputFormat::Srt | OutputFormat::Vtt | OutputFormat::Txt => "text/plain; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// `PATCH /api/jobs/{id}/speakers` — relabel speaker tags on the
/// persisted transcript.
pub async fn remap_speakers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SpeakerRemapRequest>,
) -> Result<Json<transcribe_core::domain::Transcript>, HttpError> {
    let mut transcript = state.repos.transcripts.get(&id).await?;
    for segment in &mut transcript.segments {
        if let Some(speaker) = &segment.speaker {
            if let Some(new_label) = request.remap.get(speaker) {
                segment.speaker = Some(new_label.clone());
            }
        }
    }
    transcript.recompute_speaker_count();
    state.repos.transcripts.put(transcript.clone()).await?;
    Ok(Json(transcript))
}

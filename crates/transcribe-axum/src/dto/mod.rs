//! Request/response DTOs for the HTTP API contract.
//!
//! Domain types (`Job`, `Transcript`, `Model`, ...) already derive
//! `Serialize`/`Deserialize` and are returned directly from handlers;
//! this module only covers request shapes that don't map onto a
//! domain type one-to-one.

use serde::{Deserialize, Serialize};

use transcribe_core::domain::{ModelCapabilities, ModelSource, ModelType, OutputFormat};

/// Query parameters for `GET /api/jobs/{id}/transcript`.
#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

/// Query parameters for `GET /api/batches/{id}/export`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

/// Body of `PATCH /api/jobs/{id}/speakers` — relabels one or more
/// speaker tags on the job's persisted transcript.
#[derive(Debug, Deserialize)]
pub struct SpeakerRemapRequest {
    /// Old label -> new label.
    pub remap: std::collections::HashMap<String, String>,
}

/// Body of `POST /api/queue/reorder`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub job_ids: Vec<String>,
}

/// Body of `POST /api/queue/{id}/priority`.
#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    pub priority: u8,
}

/// Body of `POST /api/models`.
#[derive(Debug, Deserialize)]
pub struct RegisterModelRequest {
    pub name: String,
    pub model_type: ModelType,
    pub engine: String,
    #[serde(default = "default_model_source")]
    pub source: ModelSource,
    pub upstream_id: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
    #[serde(default)]
    pub is_default: bool,
}

fn default_model_source() -> ModelSource {
    ModelSource::Registry
}

/// Body of `POST /api/models/{id}/download`.
#[derive(Debug, Deserialize, Default)]
pub struct DownloadModelRequest {
    #[serde(default)]
    pub force: bool,
}

/// Body of `DELETE /api/models/{id}`.
#[derive(Debug, Deserialize, Default)]
pub struct DeleteModelQuery {
    #[serde(default)]
    pub remove_files: bool,
}

/// Query parameters of `GET /api/system/evaluate` — a hypothetical job's
/// resource requirements, checked against the probed host.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub stt_model_id: Option<i64>,
    pub diarization_model_id: Option<i64>,
    pub tts_model_id: Option<i64>,
}

/// Response of `GET /api/system/evaluate`.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub fits_in_memory: bool,
    pub available_mb: u64,
    pub required_mb: u64,
}

/// Response of `GET /api/queue`.
#[derive(Debug, Serialize)]
pub struct QueueSnapshot {
    pub admission_limit: u32,
    pub in_flight: u32,
    pub jobs: Vec<transcribe_core::domain::Job>,
}

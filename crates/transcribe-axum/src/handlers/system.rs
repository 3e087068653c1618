//! System diagnostic handlers: probed hardware, feasibility evaluation
//! for a hypothetical job, live GPU usage, and a benchmark stub.

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::dto::{EvaluateRequest, EvaluateResponse};
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HardwareInfo {
    pub memory: transcribe_core::ports::SystemMemoryInfo,
    pub gpus: Vec<transcribe_core::ports::GpuInfo>,
    pub admission_limit: u32,
}

/// `GET /api/system/hardware`
pub async fn hardware(State(state): State<AppState>) -> Json<HardwareInfo> {
    let memory = state.probe.memory_info().await;
    let gpus = state.probe.gpu_info().await;
    Json(HardwareInfo {
        memory,
        gpus,
        admission_limit: state.scheduler.admission_limit(),
    })
}

/// `GET /api/system/evaluate` — rough feasibility check for a
/// hypothetical job's model selection against probed host memory.
pub async fn evaluate(
    State(state): State<AppState>,
    Query(request): Query<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, HttpError> {
    let memory = state.probe.memory_info().await;

    let mut required_mb = 0u64;
    for model_id in [request.stt_model_id, request.diarization_model_id, request.tts_model_id]
        .into_iter()
        .flatten()
    {
        let model = state.repos.models.get(model_id).await?;
        if let Some(gb) = model.capabilities.recommended_memory_gb {
            required_mb += (gb * 1024.0) as u64;
        }
    }

    Ok(Json(EvaluateResponse {
        fits_in_memory: required_mb <= memory.available_mb,
        available_mb: memory.available_mb,
        required_mb,
    }))
}

/// `GET /api/system/gpu-usage`
pub async fn gpu_usage(State(state): State<AppState>) -> Json<Vec<transcribe_core::ports::GpuInfo>> {
    Json(state.probe.gpu_info().await)
}

#[derive(Debug, Serialize)]
pub struct BenchmarkResult {
    pub admission_limit: u32,
    pub in_flight: u32,
    pub memory: transcribe_core::ports::SystemMemoryInfo,
}

/// `GET /api/system/benchmark` — a lightweight point-in-time snapshot,
/// not a synthetic workload run.
pub async fn benchmark(State(state): State<AppState>) -> Json<BenchmarkResult> {
    Json(BenchmarkResult {
        admission_limit: state.scheduler.admission_limit(),
        in_flight: state.scheduler.in_flight(),
        memory: state.probe.memory_info().await,
    })
}

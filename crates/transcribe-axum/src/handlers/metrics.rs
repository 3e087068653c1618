//! `GET /metrics` — Prometheus text exposition format.

use axum::extract::State;
use axum::response::IntoResponse;

use transcribe_core::domain::JobStatus;

use crate::state::AppState;

const ALL_STATUSES: [JobStatus; 10] = [
    JobStatus::Pending,
    JobStatus::Queued,
    JobStatus::Preparing,
    JobStatus::Transcribing,
    JobStatus::Diarizing,
    JobStatus::Synthesizing,
    JobStatus::Syncing,
    JobStatus::Completed,
    JobStatus::Failed,
    JobStatus::Cancelled,
];

/// `GET /metrics`
pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = String::new();

    body.push_str("# HELP stt_jobs_total Total jobs observed, by terminal/in-flight status.\n");
    body.push_str("# TYPE stt_jobs_total gauge\n");
    for status in ALL_STATUSES {
        let count = state.repos.jobs.count_by_status(status).await.unwrap_or(0);
        body.push_str(&format!("stt_jobs_total{{status=\"{}\"}} {count}\n", status.as_str()));
    }

    let last_hour = state.repos.jobs.count_completed_last_hour().await.unwrap_or(0);
    body.push_str("# HELP stt_jobs_last_hour Jobs that reached a terminal state in the last hour.\n");
    body.push_str("# TYPE stt_jobs_last_hour gauge\n");
    body.push_str(&format!("stt_jobs_last_hour {last_hour}\n"));

    let models_downloaded = state.repos.models.count_present().await.unwrap_or(0);
    body.push_str("# HELP stt_models_downloaded Models with locally present bytes.\n");
    body.push_str("# TYPE stt_models_downloaded gauge\n");
    body.push_str(&format!("stt_models_downloaded {models_downloaded}\n"));

    let completed = completed_jobs(&state).await;

    body.push_str("# HELP stt_audio_processed_seconds Cumulative audio duration processed.\n");
    body.push_str("# TYPE stt_audio_processed_seconds counter\n");
    let audio_seconds: f64 = completed.iter().filter_map(|job| job.duration).sum();
    body.push_str(&format!("stt_audio_processed_seconds {audio_seconds:.3}\n"));

    body.push_str("# HELP stt_processing_time_seconds Cumulative wall-clock processing time.\n");
    body.push_str("# TYPE stt_processing_time_seconds counter\n");
    let processing_seconds: f64 = completed
        .iter()
        .filter_map(|job| Some((job.started_at?, job.completed_at?)))
        .map(|(started, completed)| (completed - started).num_milliseconds() as f64 / 1000.0)
        .sum();
    body.push_str(&format!("stt_processing_time_seconds {processing_seconds:.3}\n"));

    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

async fn completed_jobs(state: &AppState) -> Vec<transcribe_core::domain::Job> {
    use transcribe_core::ports::store::{Filter, Order, Page};

    state
        .repos
        .jobs
        .list(Filter::by_status(JobStatus::Completed), Order::CreatedAtDesc, Page::first(10_000))
        .await
        .unwrap_or_default()
}

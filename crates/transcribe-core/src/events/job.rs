//! Job/queue event payloads.

use serde::{Deserialize, Serialize};

use crate::domain::JobStatus;

/// Lightweight job view carried in broadcast events — not the full `Job`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgressData {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub stage: String,
    pub progress: u8,
    pub message: String,
}

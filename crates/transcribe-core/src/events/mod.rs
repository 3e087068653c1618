//! The application's broadcast event union.
//!
//! Every event the system emits over the SSE/WS facade is a variant of
//! [`AppEvent`]. The wire shape is a tagged union (`{"type": ..., ...}`)
//! so that front-end clients can dispatch on `type` without inspecting
//! the rest of the payload.

pub mod download;
pub mod job;

use serde::{Deserialize, Serialize};

pub use download::{ModelDownloadOutcome, ModelDownloadProgress};
pub use job::{JobProgressData, JobSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    JobProgress {
        data: JobProgressData,
    },
    StatusChanged {
        job: JobSummary,
    },
    JobCompleted {
        job: JobSummary,
    },
    JobFailed {
        job: JobSummary,
    },
    JobCancelled {
        job: JobSummary,
    },
    PriorityChanged {
        #[serde(rename = "jobId")]
        job_id: String,
        priority: u8,
    },
    QueueBatchReordered {
        order: Vec<String>,
    },
    ModelDownloadProgress {
        #[serde(flatten)]
        progress: ModelDownloadProgress,
    },
    ModelDownloadCompleted {
        #[serde(flatten)]
        outcome: ModelDownloadOutcome,
    },
    ModelDownloadFailed {
        #[serde(flatten)]
        outcome: ModelDownloadOutcome,
    },
    /// Delivered as the last event a lagging subscriber sees before
    /// resuming at the bus's current position: `skipped` events between
    /// the subscriber's last receive and now were dropped and will
    /// never be delivered.
    Overflow {
        skipped: u64,
    },
    Ping,
}

impl AppEvent {
    /// The wire `type` discriminant, for logging and test assertions.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::JobProgress { .. } => "job_progress",
            Self::StatusChanged { .. } => "status_changed",
            Self::JobCompleted { .. } => "job_completed",
            Self::JobFailed { .. } => "job_failed",
            Self::JobCancelled { .. } => "job_cancelled",
            Self::PriorityChanged { .. } => "priority_changed",
            Self::QueueBatchReordered { .. } => "queue_batch_reordered",
            Self::ModelDownloadProgress { .. } => "model_download_progress",
            Self::ModelDownloadCompleted { .. } => "model_download_completed",
            Self::ModelDownloadFailed { .. } => "model_download_failed",
            Self::Overflow { .. } => "overflow",
            Self::Ping => "ping",
        }
    }

    /// The job or model id this event concerns, if any — used to scope
    /// per-job SSE subscriptions.
    #[must_use]
    pub fn subject_id(&self) -> Option<String> {
        match self {
            Self::JobProgress { data } => Some(data.job_id.clone()),
            Self::StatusChanged { job }
            | Self::JobCompleted { job }
            | Self::JobFailed { job }
            | Self::JobCancelled { job } => Some(job.id.clone()),
            Self::PriorityChanged { job_id, .. } => Some(job_id.clone()),
            Self::ModelDownloadProgress { progress } => Some(progress.model_id.to_string()),
            Self::ModelDownloadCompleted { outcome } | Self::ModelDownloadFailed { outcome } => {
                Some(outcome.model_id.to_string())
            }
            Self::QueueBatchReordered { .. } | Self::Overflow { .. } | Self::Ping => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobStatus;

    #[test]
    fn event_names_are_locked_down() {
        let job = JobSummary {
            id: "j1".into(),
            status: JobStatus::Completed,
            progress: 100,
            priority: 5,
            error_message: None,
        };
        assert_eq!(
            AppEvent::JobCompleted { job: job.clone() }.event_name(),
            "job_completed"
        );
        assert_eq!(AppEvent::Ping.event_name(), "ping");
        assert_eq!(
            AppEvent::JobCompleted { job }.subject_id().as_deref(),
            Some("j1")
        );
    }

    #[test]
    fn overflow_event_has_no_subject() {
        let event = AppEvent::Overflow { skipped: 7 };
        assert_eq!(event.event_name(), "overflow");
        assert_eq!(event.subject_id(), None);
    }

    #[test]
    fn serializes_with_tag() {
        let event = AppEvent::PriorityChanged {
            job_id: "j1".into(),
            priority: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "priority_changed");
        assert_eq!(json["priority"], 3);
    }
}

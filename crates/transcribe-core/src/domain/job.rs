//! Job domain types.
//!
//! These types represent transcription jobs in the system, independent of
//! any infrastructure concerns (database, filesystem, scheduler, etc.).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// `Pending` is a transient pre-enqueue state used only while the upload is
/// being materialized to disk; `enqueue` moves a job from `Pending` to
/// `Queued` atomically. `Completed`, `Failed`, and `Cancelled` are terminal:
/// once reached, no further transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Preparing,
    Transcribing,
    Diarizing,
    Synthesizing,
    Syncing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether this status is terminal (no further transition is legal).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a job in this status can still be reordered/reprioritized.
    #[must_use]
    pub const fn is_reorderable(self) -> bool {
        matches!(self, Self::Pending | Self::Queued)
    }

    /// Whether this status means the job has left the queue and is running.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(
            self,
            Self::Preparing | Self::Transcribing | Self::Diarizing | Self::Synthesizing | Self::Syncing
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Preparing => "preparing",
            Self::Transcribing => "transcribing",
            Self::Diarizing => "diarizing",
            Self::Synthesizing => "synthesizing",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "queued" => Self::Queued,
            "preparing" => Self::Preparing,
            "transcribing" => Self::Transcribing,
            "diarizing" => Self::Diarizing,
            "synthesizing" => Self::Synthesizing,
            "syncing" => Self::Syncing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }
}

/// Requested export formats for a completed transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Json,
    Srt,
    Vtt,
    Txt,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Txt => "txt",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "json" => Self::Json,
            "srt" => Self::Srt,
            "vtt" => Self::Vtt,
            "txt" => Self::Txt,
            _ => return None,
        })
    }
}

/// Feature flags selected for a job's pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFeatures {
    pub diarize: bool,
    pub synthesize: bool,
    pub sync_tts_timing: bool,
}

/// Model selection for a job's enabled stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobModels {
    pub stt_model_id: Option<i64>,
    pub diarization_model_id: Option<i64>,
    pub tts_model_id: Option<i64>,
}

/// A persisted transcription job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub original_filename: String,
    pub input_path: String,
    pub source_language: Option<String>,
    pub translate_to: Option<String>,
    pub models: JobModels,
    pub features: JobFeatures,
    pub priority: u8,
    pub output_formats: Vec<OutputFormat>,
    pub status: JobStatus,
    pub stage: Option<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub output_dir: String,
    pub duration: Option<f64>,
    pub batch_id: Option<String>,
    /// Transient courtesy value; the Scheduler, not the Store, is authoritative
    /// for `queue_position` while a job is queued.
    pub queue_position: Option<u32>,
}

impl Job {
    /// Check the job's invariants (`spec.md` §3). Intended for tests and
    /// defensive assertions at Store boundaries, not for hot-path validation.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let progress_ok = (self.progress == 100) == (self.status == JobStatus::Completed);
        let started_ok = self.started_at.is_some() || self.status == JobStatus::Pending || self.status == JobStatus::Queued;
        progress_ok && started_ok
    }
}

/// A job not yet persisted.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub original_filename: String,
    pub input_path: String,
    pub source_language: Option<String>,
    pub translate_to: Option<String>,
    pub models: JobModels,
    pub features: JobFeatures,
    pub priority: u8,
    pub output_formats: Vec<OutputFormat>,
    pub output_dir: String,
    pub batch_id: Option<String>,
}

impl NewJob {
    /// Priority is clamped into `[1, 10]` per `spec.md` §3.
    #[must_use]
    pub fn clamp_priority(priority: u8) -> u8 {
        priority.clamp(1, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Transcribing.is_terminal());
    }

    #[test]
    fn reorderable_statuses() {
        assert!(JobStatus::Queued.is_reorderable());
        assert!(JobStatus::Pending.is_reorderable());
        assert!(!JobStatus::Transcribing.is_reorderable());
        assert!(!JobStatus::Completed.is_reorderable());
    }

    #[test]
    fn status_roundtrip() {
        for s in [
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
        ] {
            assert_eq!(JobStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn priority_clamp() {
        assert_eq!(NewJob::clamp_priority(0), 1);
        assert_eq!(NewJob::clamp_priority(15), 10);
        assert_eq!(NewJob::clamp_priority(5), 5);
    }

    #[test]
    fn invariant_progress_completed_pair() {
        let mut job = sample_job();
        job.status = JobStatus::Completed;
        job.progress = 100;
        job.started_at = Some(Utc::now());
        assert!(job.invariants_hold());

        job.progress = 99;
        assert!(!job.invariants_hold());
    }

    fn sample_job() -> Job {
        Job {
            id: "job-1".into(),
            original_filename: "a.wav".into(),
            input_path: "/tmp/a.wav".into(),
            source_language: None,
            translate_to: None,
            models: JobModels::default(),
            features: JobFeatures::default(),
            priority: 5,
            output_formats: vec![OutputFormat::Json],
            status: JobStatus::Queued,
            stage: None,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            output_dir: "/tmp/out/job-1".into(),
            duration: None,
            batch_id: None,
            queue_position: None,
        }
    }
}

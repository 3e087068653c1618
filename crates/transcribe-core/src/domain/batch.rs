//! Job batch domain types — a cohort of jobs sharing one submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

/// A cohort of jobs sharing one submission.
///
/// `completed_files`, `failed_files`, and `progress` are a deterministic
/// function of member jobs and are recomputed on every member terminal
/// transition (`spec.md` §3) — never mutated directly by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBatch {
    pub id: String,
    pub total_files: u32,
    pub completed_files: u32,
    pub failed_files: u32,
    pub progress: u8,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
}

impl JobBatch {
    /// Recompute aggregate counters from member job statuses and progress.
    ///
    /// `member_progress` is each member's own `0..=100` progress value
    /// (terminal or not); the batch progress is their mean, floored.
    #[must_use]
    pub fn recompute(
        id: String,
        created_at: DateTime<Utc>,
        completed: u32,
        failed: u32,
        total: u32,
        member_progress: &[u8],
    ) -> Self {
        debug_assert!(completed + failed <= total);
        let progress = if member_progress.is_empty() {
            0
        } else {
            let sum: u32 = member_progress.iter().map(|&p| p as u32).sum();
            (sum / member_progress.len() as u32) as u8
        };
        let status = if completed + failed < total {
            BatchStatus::Processing
        } else if failed == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        Self {
            id,
            total_files: total,
            completed_files: completed,
            failed_files: failed,
            progress,
            status,
            created_at,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.status, BatchStatus::Completed | BatchStatus::Failed)
    }
}

impl BatchStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => return None,
        })
    }
}

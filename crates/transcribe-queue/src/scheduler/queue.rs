//! Ordered in-memory view of admissible jobs.
//!
//! The Store is authoritative for persisted job rows; this queue is a
//! lightweight, `(priority, created_at)`-ordered index over the subset
//! that's still `pending`/`queued`, kept in sync by the scheduler so
//! admission decisions don't need a fresh Store query every time.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// One queued job's ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AdmissionKey {
    pub priority: u8,
    pub created_at_millis: i64,
}

impl AdmissionKey {
    #[must_use]
    pub fn new(priority: u8, created_at: DateTime<Utc>) -> Self {
        Self {
            priority,
            created_at_millis: created_at.timestamp_millis(),
        }
    }
}

/// An `IndexMap`-backed admission queue ordered by `(priority, created_at)`.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    entries: IndexMap<String, AdmissionKey>,
}

impl AdmissionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, job_id: String, key: AdmissionKey) {
        self.entries.insert(job_id, key);
        self.entries
            .sort_by(|_, a, _, b| a.cmp(b));
    }

    pub fn remove(&mut self, job_id: &str) -> bool {
        self.entries.shift_remove(job_id).is_some()
    }

    #[must_use]
    pub fn contains(&self, job_id: &str) -> bool {
        self.entries.contains_key(job_id)
    }

    /// The job ids in admission order, lowest `(priority, created_at)` first.
    #[must_use]
    pub fn ordered_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// 1-based position of `job_id` within the queue, if present.
    #[must_use]
    pub fn position(&self, job_id: &str) -> Option<u32> {
        self.entries
            .get_index_of(job_id)
            .map(|idx| idx as u32 + 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The next job to admit, without removing it.
    #[must_use]
    pub fn peek_front(&self) -> Option<&str> {
        self.entries.keys().next().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn orders_by_priority_then_created_at() {
        let mut q = AdmissionQueue::new();
        q.insert("c".into(), AdmissionKey::new(5, at(1)));
        q.insert("a".into(), AdmissionKey::new(1, at(2)));
        q.insert("b".into(), AdmissionKey::new(1, at(1)));

        assert_eq!(q.ordered_ids(), vec!["b", "a", "c"]);
        assert_eq!(q.position("a"), Some(2));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut q = AdmissionQueue::new();
        q.insert("a".into(), AdmissionKey::new(1, at(1)));
        assert!(q.remove("a"));
        assert!(!q.remove("a"));
        assert!(q.is_empty());
    }
}

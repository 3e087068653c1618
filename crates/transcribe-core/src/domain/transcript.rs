//! Transcript domain types — one-to-one with a completed `Job`.

use serde::{Deserialize, Serialize};

/// Per-word timing, emitted by STT adapters that support it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// One transcribed segment.
///
/// Invariants (`spec.md` §3): segments are ordered by `index`, `index` is
/// dense from 0, and `end >= start >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: Option<String>,
    pub words: Option<Vec<WordTiming>>,
    pub confidence: Option<f32>,
}

impl Segment {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start >= 0.0 && self.end >= self.start
    }

    #[must_use]
    pub const fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Verify the segment-ordering invariant over a full transcript's segments.
#[must_use]
pub fn segments_well_formed(segments: &[Segment]) -> bool {
    segments
        .iter()
        .enumerate()
        .all(|(i, s)| s.index == i as u32 && s.is_valid())
}

/// One-to-one transcript record for a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub job_id: String,
    pub detected_language: String,
    pub duration: f64,
    pub word_count: u32,
    pub full_text: String,
    pub speaker_count: u32,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Recompute `speaker_count` from the distinct speaker labels present.
    pub fn recompute_speaker_count(&mut self) {
        let mut labels: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| s.speaker.as_deref())
            .collect();
        labels.sort_unstable();
        labels.dedup();
        self.speaker_count = labels.len() as u32;
    }
}

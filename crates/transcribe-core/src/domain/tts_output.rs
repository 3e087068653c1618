//! TTS output domain type — one-to-one with a `Job` that enabled synthesis.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsOutput {
    pub job_id: String,
    pub audio_path: String,
    pub sample_rate: u32,
    pub duration: f64,
    pub timing_synced: bool,
}

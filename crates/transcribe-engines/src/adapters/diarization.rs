//! Diarization adapters.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use transcribe_core::ports::engines::{DiarizationAdapter, DiarizedSegment, EngineError};

use crate::error::{map_exit_error, map_parse_error, map_spawn_error};

#[derive(Debug, Deserialize)]
struct CliTurn {
    start: f64,
    end: f64,
    speaker: String,
}

/// Invokes an external speaker-diarization CLI binary (e.g. a
/// `pyannote`-backed wrapper) and parses its JSON stdout into speaker
/// turns.
pub struct ProcessDiarizationAdapter {
    binary: String,
}

impl ProcessDiarizationAdapter {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl DiarizationAdapter for ProcessDiarizationAdapter {
    async fn diarize(&self, audio_path: &str) -> Result<Vec<DiarizedSegment>, EngineError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--input").arg(audio_path).arg("--output-format").arg("json");

        debug!(binary = %self.binary, audio_path, "invoking diarization engine");
        let output = cmd
            .output()
            .await
            .map_err(|e| map_spawn_error(&self.binary, e))?;

        if !output.status.success() {
            return Err(map_exit_error(&self.binary, &output.stderr));
        }

        let turns: Vec<CliTurn> =
            serde_json::from_slice(&output.stdout).map_err(|e| map_parse_error(&self.binary, e))?;

        Ok(turns
            .into_iter()
            .map(|t| DiarizedSegment {
                start: t.start,
                end: t.end,
                speaker: t.speaker,
            })
            .collect())
    }
}

/// Deterministic adapter for tests: splits the clip into two fixed
/// speaker turns.
pub struct FakeDiarizationAdapter {
    pub split_at: f64,
    pub duration: f64,
}

impl Default for FakeDiarizationAdapter {
    fn default() -> Self {
        Self { split_at: 5.0, duration: 10.0 }
    }
}

#[async_trait]
impl DiarizationAdapter for FakeDiarizationAdapter {
    async fn diarize(&self, _audio_path: &str) -> Result<Vec<DiarizedSegment>, EngineError> {
        Ok(vec![
            DiarizedSegment {
                start: 0.0,
                end: self.split_at,
                speaker: "SPEAKER_00".to_string(),
            },
            DiarizedSegment {
                start: self.split_at,
                end: self.duration,
                speaker: "SPEAKER_01".to_string(),
            },
        ])
    }
}

//! TTS adapters.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use transcribe_core::ports::engines::{EngineError, TtsAdapter};

use crate::error::{map_exit_error, map_parse_error, map_spawn_error};

#[derive(Debug, Deserialize)]
struct CliResult {
    sample_rate: u32,
    duration: f64,
}

/// Invokes an external TTS CLI binary (e.g. a Piper/Coqui wrapper) that
/// writes a WAV file and reports its sample rate/duration as JSON on
/// stdout.
pub struct ProcessTtsAdapter {
    binary: String,
}

impl ProcessTtsAdapter {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl TtsAdapter for ProcessTtsAdapter {
    async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        output_path: &str,
    ) -> Result<(u32, f64), EngineError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--text").arg(text).arg("--output").arg(output_path);
        if let Some(voice) = voice {
            cmd.arg("--voice").arg(voice);
        }

        debug!(binary = %self.binary, output_path, "invoking tts engine");
        let output = cmd
            .output()
            .await
            .map_err(|e| map_spawn_error(&self.binary, e))?;

        if !output.status.success() {
            return Err(map_exit_error(&self.binary, &output.stderr));
        }

        let parsed: CliResult =
            serde_json::from_slice(&output.stdout).map_err(|e| map_parse_error(&self.binary, e))?;

        Ok((parsed.sample_rate, parsed.duration))
    }
}

/// Deterministic adapter for tests: claims a fixed sample rate and a
/// duration proportional to the input text length, without touching
/// the filesystem.
pub struct FakeTtsAdapter {
    pub sample_rate: u32,
    pub seconds_per_char: f64,
}

impl Default for FakeTtsAdapter {
    fn default() -> Self {
        Self { sample_rate: 22050, seconds_per_char: 0.06 }
    }
}

#[async_trait]
impl TtsAdapter for FakeTtsAdapter {
    async fn synthesize(
        &self,
        text: &str,
        _voice: Option<&str>,
        _output_path: &str,
    ) -> Result<(u32, f64), EngineError> {
        let duration = text.chars().count() as f64 * self.seconds_per_char;
        Ok((self.sample_rate, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_adapter_scales_duration_with_text_length() {
        let adapter = FakeTtsAdapter::default();
        let (rate, duration) = adapter.synthesize("hello", None, "out.wav").await.unwrap();
        assert_eq!(rate, 22050);
        assert!((duration - 0.3).abs() < 1e-9);
    }
}

//! STT adapters.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use transcribe_core::domain::WordTiming;
use transcribe_core::ports::engines::{EngineError, SttAdapter, SttInfo, SttProgressCallback, SttSegment, SttTask};

use crate::error::{map_exit_error, map_parse_error, map_spawn_error};

#[derive(Debug, Deserialize)]
struct CliWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct CliSegment {
    start: f64,
    end: f64,
    text: String,
    confidence: Option<f32>,
    words: Option<Vec<CliWord>>,
}

#[derive(Debug, Deserialize)]
struct CliOutput {
    language: String,
    duration: f64,
    segments: Vec<CliSegment>,
}

/// Invokes an external whisper.cpp-compatible CLI binary and parses its
/// JSON stdout. One process per call — no in-process model cache, since
/// the teacher's model-cache concern (`gglib-runtime`'s long-lived
/// llama-server) lives in the pipeline's model-idle-timeout instead.
pub struct ProcessSttAdapter {
    binary: String,
}

impl ProcessSttAdapter {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl SttAdapter for ProcessSttAdapter {
    async fn transcribe(
        &self,
        audio_path: &str,
        language_hint: Option<&str>,
        task: SttTask,
        progress_cb: SttProgressCallback<'_>,
    ) -> Result<(SttInfo, Vec<SttSegment>), EngineError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--input").arg(audio_path).arg("--output-format").arg("json");
        if let Some(lang) = language_hint {
            cmd.arg("--language").arg(lang);
        }
        cmd.arg("--task").arg(match task {
            SttTask::Transcribe => "transcribe",
            SttTask::Translate => "translate",
        });

        debug!(binary = %self.binary, audio_path, ?task, "invoking stt engine");
        progress_cb(0.0);
        let output = cmd
            .output()
            .await
            .map_err(|e| map_spawn_error(&self.binary, e))?;

        if !output.status.success() {
            return Err(map_exit_error(&self.binary, &output.stderr));
        }
        progress_cb(1.0);

        let parsed: CliOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| map_parse_error(&self.binary, e))?;

        let info = SttInfo {
            detected_language: parsed.language,
            duration: parsed.duration,
        };
        let segments = parsed
            .segments
            .into_iter()
            .map(|s| SttSegment {
                start: s.start,
                end: s.end,
                text: s.text,
                confidence: s.confidence,
                words: s.words.map(|words| {
                    words
                        .into_iter()
                        .map(|w| WordTiming {
                            word: w.word,
                            start: w.start,
                            end: w.end,
                        })
                        .collect()
                }),
            })
            .collect();

        Ok((info, segments))
    }
}

/// Deterministic adapter for tests: returns a single fixed segment
/// spanning the whole (fictional) clip duration.
pub struct FakeSttAdapter {
    pub detected_language: String,
    pub duration: f64,
    pub text: String,
}

impl Default for FakeSttAdapter {
    fn default() -> Self {
        Self {
            detected_language: "en".to_string(),
            duration: 10.0,
            text: "hello from the fake adapter".to_string(),
        }
    }
}

#[async_trait]
impl SttAdapter for FakeSttAdapter {
    async fn transcribe(
        &self,
        _audio_path: &str,
        _language_hint: Option<&str>,
        _task: SttTask,
        progress_cb: SttProgressCallback<'_>,
    ) -> Result<(SttInfo, Vec<SttSegment>), EngineError> {
        progress_cb(0.0);
        progress_cb(0.5);
        progress_cb(1.0);
        let info = SttInfo {
            detected_language: self.detected_language.clone(),
            duration: self.duration,
        };
        let segments = vec![SttSegment {
            start: 0.0,
            end: self.duration,
            text: self.text.clone(),
            confidence: Some(0.99),
            words: None,
        }];
        Ok((info, segments))
    }
}

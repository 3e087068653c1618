//! Inference engine adapter ports — STT, diarization, and TTS.
//!
//! These are the seams between the pipeline executor and whatever
//! concrete backend (local `whisper.cpp`, a remote HTTP engine, a test
//! fake) actually does the work.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an engine adapter while loading a model or running
/// inference.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("engine process failed: {0}")]
    ProcessFailed(String),

    #[error("engine timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(String),
}

/// One STT-recognized segment, prior to diarization.
#[derive(Debug, Clone)]
pub struct SttSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Option<Vec<crate::domain::WordTiming>>,
    pub confidence: Option<f32>,
}

/// Metadata an STT pass reports about the whole input.
#[derive(Debug, Clone)]
pub struct SttInfo {
    pub detected_language: String,
    pub duration: f64,
}

/// A speaker-attributed time range produced by diarization.
#[derive(Debug, Clone)]
pub struct DiarizedSegment {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

/// Which task an STT pass should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttTask {
    /// Transcribe in the spoken language.
    Transcribe,
    /// Transcribe and translate into English.
    Translate,
}

/// Reports a fraction of `audio_path`'s duration processed so far, in
/// `[0.0, 1.0]`. Called zero or more times during a `transcribe` call;
/// the final call need not be exactly `1.0`.
pub type SttProgressCallback<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[async_trait]
pub trait SttAdapter: Send + Sync {
    /// Transcribe `audio_path` (a mono PCM/WAV file prepared by the
    /// pipeline) and return its segments plus detected language.
    async fn transcribe(
        &self,
        audio_path: &str,
        language_hint: Option<&str>,
        task: SttTask,
        progress_cb: SttProgressCallback<'_>,
    ) -> Result<(SttInfo, Vec<SttSegment>), EngineError>;
}

#[async_trait]
pub trait DiarizationAdapter: Send + Sync {
    async fn diarize(&self, audio_path: &str) -> Result<Vec<DiarizedSegment>, EngineError>;
}

#[async_trait]
pub trait TtsAdapter: Send + Sync {
    /// Synthesize `text` to a WAV file at `output_path`, returning the
    /// sample rate and duration of the result.
    async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        output_path: &str,
    ) -> Result<(u32, f64), EngineError>;
}

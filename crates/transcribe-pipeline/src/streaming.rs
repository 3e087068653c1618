//! Streaming transcription (`spec.md` §4.8).
//!
//! A rolling PCM16 buffer per session; flush triggers are RMS-energy on
//! the trailing window or an unconditional length cap, mirroring the
//! two-tier flush policy in `original_source/backend/api/stream.py`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use transcribe_core::ports::engines::{SttAdapter, SttTask};
use transcribe_core::ports::EngineError;

const SAMPLE_RATE: u32 = 16_000;
const TRAILING_WINDOW_SECS: f64 = 1.0;
const QUIET_ENERGY_THRESHOLD: f64 = 0.01;
const QUIET_MIN_BUFFER_SECS: f64 = 2.0;
const FORCE_FLUSH_SECS: f64 = 5.0;

/// The result of submitting a buffer for a partial/final transcript.
#[derive(Debug, Clone)]
pub struct StreamingTranscript {
    pub text: String,
    pub is_final: bool,
}

fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| {
        let v = f64::from(s) / f64::from(i16::MAX);
        v * v
    }).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn should_flush(buffer: &[i16]) -> Option<bool> {
    let total_secs = buffer.len() as f64 / f64::from(SAMPLE_RATE);
    if total_secs > FORCE_FLUSH_SECS {
        return Some(false); // unconditional cap -> not final
    }
    if total_secs > QUIET_MIN_BUFFER_SECS {
        let trailing_len = (TRAILING_WINDOW_SECS * f64::from(SAMPLE_RATE)) as usize;
        let trailing = &buffer[buffer.len().saturating_sub(trailing_len)..];
        if rms(trailing) < QUIET_ENERGY_THRESHOLD {
            return Some(true); // silence detected -> final
        }
    }
    None
}

/// One live streaming session: owns a rolling buffer and the STT
/// adapter currently selected for it.
pub struct StreamingSession {
    adapter: Mutex<Arc<dyn SttAdapter>>,
    buffer: Mutex<Vec<i16>>,
}

impl StreamingSession {
    #[must_use]
    pub fn new(adapter: Arc<dyn SttAdapter>) -> Self {
        Self { adapter: Mutex::new(adapter), buffer: Mutex::new(Vec::new()) }
    }

    /// Switch the STT adapter mid-session; buffered PCM is retained.
    pub async fn configure(&self, adapter: Arc<dyn SttAdapter>) {
        *self.adapter.lock().await = adapter;
    }

    /// Empty the buffer without transcribing it.
    pub async fn clear(&self) {
        self.buffer.lock().await.clear();
    }

    /// Push a chunk of 16 kHz mono PCM16 samples. Returns a transcript
    /// if a flush trigger fired.
    pub async fn push_chunk(
        &self,
        chunk: &[i16],
    ) -> Result<Option<StreamingTranscript>, EngineError> {
        let mut buffer = self.buffer.lock().await;
        buffer.extend_from_slice(chunk);

        let Some(is_final) = should_flush(&buffer) else {
            return Ok(None);
        };

        let samples = std::mem::take(&mut *buffer);
        drop(buffer);

        debug!(sample_count = samples.len(), is_final, "flushing streaming buffer");
        let path = write_pcm_to_tempfile(&samples)?;
        let adapter = self.adapter.lock().await.clone();
        let (_, segments) = adapter.transcribe(&path, None, SttTask::Transcribe, &|_| {}).await?;
        let _ = std::fs::remove_file(&path);

        let text = segments.into_iter().map(|s| s.text).collect::<Vec<_>>().join(" ");
        Ok(Some(StreamingTranscript { text, is_final }))
    }
}

fn write_pcm_to_tempfile(samples: &[i16]) -> Result<String, EngineError> {
    let path = std::env::temp_dir().join(format!("stream-{}.pcm", uuid_like()));
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(&path, bytes).map_err(|e| EngineError::Io(e.to_string()))?;
    Ok(path.to_string_lossy().into_owned())
}

fn uuid_like() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use transcribe_core::ports::engines::{SttInfo, SttProgressCallback, SttSegment};

    struct FixedAdapter;

    #[async_trait]
    impl SttAdapter for FixedAdapter {
        async fn transcribe(
            &self,
            _audio_path: &str,
            _language_hint: Option<&str>,
            _task: SttTask,
            _progress_cb: SttProgressCallback<'_>,
        ) -> Result<(SttInfo, Vec<SttSegment>), EngineError> {
            Ok((
                SttInfo { detected_language: "en".into(), duration: 1.0 },
                vec![SttSegment {
                    start: 0.0,
                    end: 1.0,
                    text: "hi".into(),
                    words: None,
                    confidence: None,
                }],
            ))
        }
    }

    #[test]
    fn silence_over_threshold_triggers_final_flush() {
        let mut buffer = vec![0i16; (2.5 * f64::from(SAMPLE_RATE)) as usize];
        buffer.truncate(buffer.len()); // all zero -> silent
        assert_eq!(should_flush(&buffer), Some(true));
    }

    #[test]
    fn short_loud_buffer_does_not_flush() {
        let buffer = vec![i16::MAX; (1.0 * f64::from(SAMPLE_RATE)) as usize];
        assert_eq!(should_flush(&buffer), None);
    }

    #[test]
    fn unconditional_cap_flushes_non_final() {
        let buffer = vec![i16::MAX; (5.5 * f64::from(SAMPLE_RATE)) as usize];
        assert_eq!(should_flush(&buffer), Some(false));
    }

    #[tokio::test]
    async fn clear_empties_buffer_without_transcribing() {
        let session = StreamingSession::new(Arc::new(FixedAdapter));
        session.push_chunk(&vec![i16::MAX; 1000]).await.unwrap();
        session.clear().await;
        assert!(session.buffer.lock().await.is_empty());
    }

    #[tokio::test]
    async fn silence_flush_returns_transcript() {
        let session = StreamingSession::new(Arc::new(FixedAdapter));
        let quiet = vec![0i16; (3.0 * f64::from(SAMPLE_RATE)) as usize];
        let result = session.push_chunk(&quiet).await.unwrap();
        let transcript = result.expect("should flush");
        assert!(transcript.is_final);
        assert_eq!(transcript.text, "hi");
    }
}

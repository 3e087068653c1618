//! Prepare stage (`spec.md` §4.5 step 0): demux video containers down
//! to 16 kHz mono PCM WAV; pass audio input through unchanged.

use async_trait::async_trait;

use transcribe_core::ports::CoreError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi"];

#[must_use]
pub fn is_video_container(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Demuxes a video container to mono PCM at `target_sample_rate`.
#[async_trait]
pub trait Demuxer: Send + Sync {
    async fn demux_to_wav(
        &self,
        source_path: &str,
        output_path: &str,
        target_sample_rate: u32,
    ) -> Result<(), CoreError>;
}

/// Shells out to `ffmpeg -ac 1 -ar <rate>` to demux.
pub struct FfmpegDemuxer {
    binary: String,
}

impl FfmpegDemuxer {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl Demuxer for FfmpegDemuxer {
    async fn demux_to_wav(
        &self,
        source_path: &str,
        output_path: &str,
        target_sample_rate: u32,
    ) -> Result<(), CoreError> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(source_path)
            .arg("-vn")
            .arg("-ac")
            .arg("1")
            .arg("-ar")
            .arg(target_sample_rate.to_string())
            .arg(output_path)
            .output()
            .await
            .map_err(|e| CoreError::Internal(format!("ffmpeg spawn failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Internal(format!("ffmpeg demux failed: {stderr}")));
        }
        Ok(())
    }
}

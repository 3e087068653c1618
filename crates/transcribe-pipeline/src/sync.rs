//! Timing Sync Engine (`spec.md` §4.7).
//!
//! Shells out to a muxing tool behind the [`VideoMuxer`] port, mirroring
//! how `transcribe-engines`' process adapters keep the external binary
//! out of the crate's own dependency surface.

use async_trait::async_trait;

use transcribe_core::ports::CoreError;

/// Read a mono WAV file's samples as `f32` in `[-1.0, 1.0]`, alongside
/// its declared sample rate. Stereo input is downmixed by averaging
/// channels.
pub fn read_wav_mono_f32(path: &str) -> Result<(Vec<f32>, u32), CoreError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| CoreError::Internal(format!("failed to open wav {path}: {e}")))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Internal(format!("failed to read wav samples: {e}")))?,
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CoreError::Internal(format!("failed to read wav samples: {e}")))?
        }
    };

    let mono = if channels <= 1 {
        samples
    } else {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

/// Write mono `f32` samples to a 16-bit PCM WAV file.
pub fn write_wav_mono_f32(path: &str, samples: &[f32], sample_rate: u32) -> Result<(), CoreError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| CoreError::Internal(format!("failed to create wav {path}: {e}")))?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * f32::from(i16::MAX)) as i16)
            .map_err(|e| CoreError::Internal(format!("failed to write wav sample: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| CoreError::Internal(format!("failed to finalize wav {path}: {e}")))?;
    Ok(())
}

pub const CANONICAL_SAMPLE_RATE: u32 = 22_050;
const MIN_STRETCH_RATIO: f64 = 0.25;
const MAX_STRETCH_RATIO: f64 = 4.0;

/// One synthesized segment ready to be placed onto the sync timeline.
#[derive(Debug, Clone)]
pub struct SynthesizedSegment {
    pub start: f64,
    pub end: f64,
    /// PCM samples at `source_sample_rate`, mono.
    pub samples: Vec<f32>,
    pub source_sample_rate: u32,
}

impl SynthesizedSegment {
    fn source_duration(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.source_sample_rate)
    }
}

/// Clamp `(end - start) / source_duration` into `[0.25, 4.0]`
/// (`spec.md` §4.7 step 1).
#[must_use]
pub fn stretch_ratio(start: f64, end: f64, source_duration: f64) -> f64 {
    if source_duration <= 0.0 {
        return MAX_STRETCH_RATIO;
    }
    ((end - start) / source_duration).clamp(MIN_STRETCH_RATIO, MAX_STRETCH_RATIO)
}

/// Resample `samples` from `from_rate` to `to_rate` by linear
/// interpolation, and independently scale its length by `stretch` (a
/// playback-speed factor — the time-stretch-without-pitch-shift step is
/// driven by the caller choosing how many output samples to draw, not a
/// pitch-preserving algorithm this function need model here).
fn resample_and_stretch(samples: &[f32], from_rate: u32, to_rate: u32, stretch: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let out_len = ((samples.len() as f64) * (f64::from(to_rate) / f64::from(from_rate)) * stretch)
        .round()
        .max(1.0) as usize;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * (samples.len() - 1).max(1) as f64 / (out_len.max(1) as f64 - 1.0).max(1.0);
        let lo = src_pos.floor() as usize;
        let hi = (lo + 1).min(samples.len() - 1);
        let frac = src_pos - lo as f64;
        let value = samples[lo] * (1.0 - frac as f32) + samples[hi] * frac as f32;
        out.push(value);
    }
    out
}

/// Builds a single audio track of length `total_duration` at
/// `sample_rate`, placing each stretched segment at `round(start *
/// sample_rate)`. Later segments win on overlap (`spec.md` §4.7 step 3).
#[must_use]
pub fn build_timeline(
    segments: &[SynthesizedSegment],
    total_duration: f64,
    sample_rate: u32,
) -> Vec<f32> {
    let buffer_len = (total_duration * f64::from(sample_rate)).round().max(0.0) as usize;
    let mut buffer = vec![0.0f32; buffer_len];

    for segment in segments {
        let ratio = stretch_ratio(segment.start, segment.end, segment.source_duration());
        let stretched = resample_and_stretch(&segment.samples, segment.source_sample_rate, sample_rate, ratio);
        let start_sample = (segment.start * f64::from(sample_rate)).round().max(0.0) as usize;
        for (offset, sample) in stretched.into_iter().enumerate() {
            let idx = start_sample + offset;
            if idx >= buffer_len {
                break;
            }
            buffer[idx] = sample;
        }
    }

    buffer
}

/// Remuxes a video container, copying the video track and replacing
/// audio with the synced track (`spec.md` §4.7 step 4).
#[async_trait]
pub trait VideoMuxer: Send + Sync {
    async fn remux(
        &self,
        source_video_path: &str,
        synced_audio_path: &str,
        output_path: &str,
    ) -> Result<(), CoreError>;
}

/// Shells out to `ffmpeg -c:v copy` with the source video's video track
/// and the synced audio track.
pub struct FfmpegVideoMuxer {
    binary: String,
}

impl FfmpegVideoMuxer {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl VideoMuxer for FfmpegVideoMuxer {
    async fn remux(
        &self,
        source_video_path: &str,
        synced_audio_path: &str,
        output_path: &str,
    ) -> Result<(), CoreError> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(source_video_path)
            .arg("-i")
            .arg(synced_audio_path)
            .arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("1:a:0")
            .arg("-c:v")
            .arg("copy")
            .arg("-shortest")
            .arg(output_path)
            .output()
            .await
            .map_err(|e| CoreError::Internal(format!("ffmpeg spawn failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Internal(format!("ffmpeg remux failed: {stderr}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_clamps_to_bounds() {
        assert!((stretch_ratio(0.0, 100.0, 1.0) - MAX_STRETCH_RATIO).abs() < f64::EPSILON);
        assert!((stretch_ratio(0.0, 0.1, 10.0) - MIN_STRETCH_RATIO).abs() < f64::EPSILON);
        assert!((stretch_ratio(0.0, 2.0, 1.0) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn timeline_places_segment_at_its_start_sample() {
        let segments = vec![SynthesizedSegment {
            start: 1.0,
            end: 2.0,
            samples: vec![1.0; 22_050],
            source_sample_rate: 22_050,
        }];
        let buffer = build_timeline(&segments, 3.0, 22_050);
        assert_eq!(buffer.len(), 66_150);
        assert!((buffer[22_050] - 1.0).abs() < 0.01);
        assert!((buffer[0]).abs() < f32::EPSILON);
    }

    #[test]
    fn later_segment_overwrites_on_overlap() {
        let segments = vec![
            SynthesizedSegment {
                start: 0.0,
                end: 2.0,
                samples: vec![1.0; 22_050 * 2],
                source_sample_rate: 22_050,
            },
            SynthesizedSegment {
                start: 1.0,
                end: 2.0,
                samples: vec![-1.0; 22_050],
                source_sample_rate: 22_050,
            },
        ];
        let buffer = build_timeline(&segments, 3.0, 22_050);
        assert!((buffer[22_050 + 100] - -1.0).abs() < 0.01, "later segment should win");
    }

    #[test]
    fn writes_past_buffer_end_are_truncated() {
        let segments = vec![SynthesizedSegment {
            start: 2.5,
            end: 3.5,
            samples: vec![1.0; 22_050],
            source_sample_rate: 22_050,
        }];
        let buffer = build_timeline(&segments, 3.0, 22_050);
        assert_eq!(buffer.len(), 66_150);
    }

    #[test]
    fn stretched_length_multiplies_by_ratio_not_divides() {
        // spec.md §8 scenario 6: a 1.0s segment synthesized as 5.0s of
        // TTS output clamps to the min ratio (0.25) and stretches to
        // source_duration * ratio = 1.25s, not source_duration / ratio.
        let source_rate = 22_050;
        let samples = vec![0.0f32; source_rate as usize * 5];
        let ratio = stretch_ratio(0.0, 1.0, 5.0);
        assert!((ratio - MIN_STRETCH_RATIO).abs() < f64::EPSILON);

        let stretched = resample_and_stretch(&samples, source_rate, source_rate, ratio);
        let stretched_duration = stretched.len() as f64 / f64::from(source_rate);
        assert!(
            (stretched_duration - 1.25).abs() < 0.01,
            "expected ~1.25s, got {stretched_duration}s"
        );
    }

    #[test]
    fn wav_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.wav");
        let path_str = path.to_str().unwrap();
        let samples = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        write_wav_mono_f32(path_str, &samples, 22_050).unwrap();

        let (read_back, rate) = read_wav_mono_f32(path_str).unwrap();
        assert_eq!(rate, 22_050);
        assert_eq!(read_back.len(), samples.len());
        for (a, b) in samples.iter().zip(read_back.iter()) {
            assert!((a - b).abs() < 0.001, "{a} vs {b}");
        }
    }
}

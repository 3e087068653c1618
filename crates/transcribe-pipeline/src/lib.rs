//! Pipeline Executor, Timing Sync Engine, and Streaming Transcription
//! (`spec.md` §4.5 - §4.8).
//!
//! This crate owns everything that happens to a job once it's been
//! admitted by `transcribe-queue`'s Scheduler: resolving models to
//! engine adapters, running the staged sequence, writing exports, and
//! (optionally) producing a timing-synced dub track. It depends on
//! `transcribe-engines` for the adapter implementations themselves but
//! knows nothing about how a job got admitted or persisted beyond the
//! Store ports it's handed.

pub mod adapters;
pub mod export;
pub mod prepare;
pub mod speaker;
pub mod streaming;
pub mod sync;

mod executor;

pub use adapters::{AdapterFactory, ProcessAdapterFactory};
pub use executor::{PipelineDeps, PipelineExecutor};
pub use export::{render, write_exports};
pub use prepare::{is_video_container, Demuxer, FfmpegDemuxer};
pub use speaker::assign_speakers;
pub use streaming::{StreamingSession, StreamingTranscript};
pub use sync::{
    build_timeline, read_wav_mono_f32, stretch_ratio, write_wav_mono_f32, FfmpegVideoMuxer,
    SynthesizedSegment, VideoMuxer, CANONICAL_SAMPLE_RATE,
};

//! Process-backed and fake adapter implementations of the
//! `transcribe_core::ports::engines` traits.

pub mod diarization;
pub mod stt;
pub mod tts;

pub use diarization::{FakeDiarizationAdapter, ProcessDiarizationAdapter};
pub use stt::{FakeSttAdapter, ProcessSttAdapter};
pub use tts::{FakeTtsAdapter, ProcessTtsAdapter};

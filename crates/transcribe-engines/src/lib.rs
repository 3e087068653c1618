//! Process-backed STT, diarization, and TTS adapters.
//!
//! Each adapter shells out to an external engine binary and parses its
//! JSON stdout; none keep a model resident in-process. The pipeline
//! executor is responsible for model lifetime (via `transcribe-queue`'s
//! `ModelRegistry`), not this crate.

pub mod adapters;
pub mod cache;
pub mod error;
pub mod probe;

pub use adapters::{
    FakeDiarizationAdapter, FakeSttAdapter, FakeTtsAdapter, ProcessDiarizationAdapter,
    ProcessSttAdapter, ProcessTtsAdapter,
};
pub use cache::AdapterCache;
pub use probe::DefaultSystemProbe;

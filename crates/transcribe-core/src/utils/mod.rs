//! Small, dependency-free helpers shared across core use-cases.

pub mod time_format;

pub use time_format::{format_srt_timestamp, format_vtt_timestamp};

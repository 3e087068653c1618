//! Timestamp formatting for subtitle export (SRT/VTT).

/// Format seconds as an SRT timestamp: `HH:MM:SS,mmm`.
#[must_use]
pub fn format_srt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds, ',')
}

/// Format seconds as a VTT timestamp: `HH:MM:SS.mmm`.
#[must_use]
pub fn format_vtt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds, '.')
}

fn format_timestamp(seconds: f64, fraction_sep: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).floor() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;
    format!("{hours:02}:{mins:02}:{secs:02}{fraction_sep}{ms:03}")
}

//! Export format writers for a completed transcript (`spec.md` §4.5).

use std::path::Path;

use tokio::fs;

use transcribe_core::domain::{OutputFormat, Transcript};
use transcribe_core::ports::CoreError;
use transcribe_core::utils::time_format::{format_srt_timestamp, format_vtt_timestamp};

/// Render a transcript to every requested format and write each to
/// `output_dir/<job_id>.<ext>`.
pub async fn write_exports(
    output_dir: &str,
    transcript: &Transcript,
    formats: &[OutputFormat],
) -> Result<(), CoreError> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| CoreError::Internal(format!("failed to create output dir: {e}")))?;

    for format in formats {
        let rendered = render(transcript, *format)
            .map_err(|e| CoreError::Internal(format!("failed to serialize transcript: {e}")))?;
        let path = Path::new(output_dir).join(format!("{}.{}", transcript.job_id, format.as_str()));
        fs::write(&path, rendered)
            .await
            .map_err(|e| CoreError::Internal(format!("failed to write {}: {e}", path.display())))?;
    }
    Ok(())
}

/// Render a transcript to a single format's text, without touching disk.
pub fn render(transcript: &Transcript, format: OutputFormat) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(transcript)?,
        OutputFormat::Srt => render_srt(transcript),
        OutputFormat::Vtt => render_vtt(transcript),
        OutputFormat::Txt => render_txt(transcript),
    })
}

fn render_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    for segment in &transcript.segments {
        out.push_str(&format!("{}\n", segment.index + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start),
            format_srt_timestamp(segment.end)
        ));
        if let Some(speaker) = &segment.speaker {
            out.push_str(&format!("[{speaker}] {}\n", segment.text));
        } else {
            out.push_str(&format!("{}\n", segment.text));
        }
        out.push('\n');
    }
    out
}

fn render_vtt(transcript: &Transcript) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in &transcript.segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(segment.start),
            format_vtt_timestamp(segment.end)
        ));
        if let Some(speaker) = &segment.speaker {
            out.push_str(&format!("[{speaker}] {}\n", segment.text));
        } else {
            out.push_str(&format!("{}\n", segment.text));
        }
        out.push('\n');
    }
    out
}

fn render_txt(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| match &s.speaker {
            Some(speaker) => format!("[{speaker}] {}", s.text),
            None => s.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

//! Error mapping shared by every process-backed adapter in this crate.

use transcribe_core::ports::EngineError;

/// Map a process spawn/IO failure to an `EngineError`.
pub fn map_spawn_error(binary: &str, err: std::io::Error) -> EngineError {
    if err.kind() == std::io::ErrorKind::NotFound {
        EngineError::ModelNotLoaded(format!("engine binary not found: {binary}"))
    } else {
        EngineError::Io(format!("{binary}: {err}"))
    }
}

/// Map a non-zero process exit to an `EngineError`, truncating stderr
/// the way the Pipeline Executor truncates adapter messages for the
/// job's `error_message` (`spec.md` §7).
pub fn map_exit_error(binary: &str, stderr: &[u8]) -> EngineError {
    let message = String::from_utf8_lossy(stderr);
    let truncated: String = message.chars().take(500).collect();
    EngineError::ProcessFailed(format!("{binary} failed: {truncated}"))
}

/// Map a stdout-parsing failure to an `EngineError`.
pub fn map_parse_error(binary: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::ProcessFailed(format!("{binary}: failed to parse output: {err}"))
}

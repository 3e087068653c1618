//! CLI-specific error types and exit-code mapping.

use thiserror::Error;

use transcribe_core::ports::CoreError;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Core(String),

    #[error("invalid arguments: {0}")]
    Arguments(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),
}

impl CliError {
    /// Map to a Unix exit code, following `sysexits.h` conventions.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 64,  // EX_USAGE
            Self::Io(_) => 74,         // EX_IOERR
            Self::Config(_) => 78,     // EX_CONFIG
            Self::Database(_) => 73,   // EX_CANTCREAT
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => Self::Database(repo_err.to_string()),
            CoreError::Validation(msg) | CoreError::PreconditionFailed(msg) | CoreError::ResourceMissing(msg) => {
                Self::Arguments(msg)
            }
            CoreError::Configuration(msg) => Self::Config(msg),
            CoreError::Engine(engine_err) => Self::Core(engine_err.to_string()),
            CoreError::Cancelled => Self::Core("operation cancelled".to_string()),
            CoreError::Internal(msg) => Self::Core(msg),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

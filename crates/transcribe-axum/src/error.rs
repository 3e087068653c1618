//! Axum-specific error types and mappings.
//!
//! Maps the core error taxonomy (`spec.md` §7) onto HTTP status codes
//! and a JSON response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use transcribe_core::ports::{CoreError, EngineError, RepositoryError};

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource missing: {0}")]
    ResourceMissing(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    error_type: Option<&'static str>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, None),
            Self::PreconditionFailed(_) => (StatusCode::PRECONDITION_FAILED, None),
            Self::Conflict(_) => (StatusCode::CONFLICT, None),
            Self::ResourceMissing(_) => (StatusCode::UNPROCESSABLE_ENTITY, Some("RESOURCE_MISSING")),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
            error_type,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => repo_err.into(),
            CoreError::Engine(engine_err) => engine_err.into(),
            CoreError::Validation(msg) => Self::BadRequest(msg),
            CoreError::PreconditionFailed(msg) => Self::PreconditionFailed(msg),
            CoreError::ResourceMissing(msg) => Self::ResourceMissing(msg),
            CoreError::Configuration(msg) => Self::Internal(format!("configuration: {msg}")),
            CoreError::Cancelled => Self::PreconditionFailed("operation cancelled".to_string()),
            CoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<RepositoryError> for HttpError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { kind, id } => Self::NotFound(format!("{kind} not found: {id}")),
            RepositoryError::AlreadyExists { kind, id } => Self::Conflict(format!("{kind} already exists: {id}")),
            RepositoryError::Storage(msg) => Self::Internal(format!("storage: {msg}")),
            RepositoryError::Serialization(msg) => Self::Internal(format!("serialization: {msg}")),
            RepositoryError::Constraint(msg) => Self::BadRequest(msg),
        }
    }
}

impl From<EngineError> for HttpError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ModelNotLoaded(msg) => Self::ResourceMissing(msg),
            EngineError::UnsupportedInput(msg) => Self::BadRequest(msg),
            EngineError::ProcessFailed(msg) => Self::ServiceUnavailable(msg),
            EngineError::Timeout => Self::ServiceUnavailable("engine timed out".to_string()),
            EngineError::Cancelled => Self::PreconditionFailed("operation cancelled".to_string()),
            EngineError::Io(msg) => Self::Internal(format!("io: {msg}")),
        }
    }
}

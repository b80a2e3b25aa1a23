//! Error taxonomy of the admin layer

use crate::engine::EngineError;
use axum::http::StatusCode;
use thiserror::Error;

/// Result type for admin operations
pub type AdminResult<T> = Result<T, AdminError>;

/// Failures surfaced to API callers
///
/// The message is the engine's own text; only the kind is decided here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminError {
    /// Unknown circle or member on a read
    #[error("{0}")]
    NotFound(String),

    /// Invalid input, rejected mutation or unresolvable user
    #[error("{0}")]
    BadRequest(String),

    /// Unexpected engine or transport failure
    #[error("{0}")]
    Internal(String),
}

impl AdminError {
    pub fn not_found(err: EngineError) -> Self {
        AdminError::NotFound(err.to_string())
    }

    pub fn bad_request(err: EngineError) -> Self {
        AdminError::BadRequest(err.to_string())
    }

    pub fn internal(err: EngineError) -> Self {
        AdminError::Internal(err.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AdminError::NotFound(msg) | AdminError::BadRequest(msg) | AdminError::Internal(msg) => msg,
        }
    }
}

//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Arendir                                │
//! │                                                                         │
//! │  Client                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  POST /rendicion_solicitud                                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  ApiResult<Json<T>>                                              │  │
//! │  │         │                                                        │  │
//! │  │  DbError::Domain(DuplicateLink) ──► kind() = Conflict ──┐        │  │
//! │  │  IntegrationError::Unavailable ──► UpstreamUnavailable ─┤        │  │
//! │  │                                                         ▼        │  │
//! │  │                                   ApiError { code, message }     │  │
//! │  │                                                         │        │  │
//! │  │                                   IntoResponse: status + JSON    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  409 { "code": "CONFLICT",                                             │
//! │        "message": "Rendicion 4 is already linked to solicitud 9" }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged in full and reach the client as a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

use crate::integrations::IntegrationError;
use arendir_core::{CoreError, ErrorKind, ValidationError};
use arendir_db::DbError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Rendicion not found: 42" }
/// ```
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Duplicate link or document, lost race (409)
    Conflict,

    /// SUNAT, storage or renderer failed (503)
    UpstreamUnavailable,

    /// No more codes for this user and kind (507)
    SequenceExhausted,

    /// Internal server error (500)
    Internal,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => ErrorCode::ValidationError,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::UpstreamUnavailable => ErrorCode::UpstreamUnavailable,
            ErrorKind::SequenceExhausted => ErrorCode::SequenceExhausted,
            ErrorKind::Internal => ErrorCode::Internal,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::SequenceExhausted => StatusCode::INSUFFICIENT_STORAGE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => ApiError::from(core),
            other => match other.kind() {
                ErrorKind::Internal => {
                    // Log the actual error but return a generic message
                    error!(error = %other, "Database operation failed");
                    ApiError::internal("Database operation failed")
                }
                kind => ApiError::new(kind.into(), other.to_string()),
            },
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::Internal => {
                error!(error = %err, "Domain invariant broken");
                ApiError::internal("Stored data is inconsistent")
            }
            kind => ApiError::new(kind.into(), err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts integration failures (storage, renderers, SUNAT).
impl From<IntegrationError> for ApiError {
    fn from(err: IntegrationError) -> Self {
        ApiError::new(err.kind().into(), err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                status = status.as_u16(),
                code = ?self.code,
                message = %self.message,
                "Request failed"
            );
        }
        (status, Json(self)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

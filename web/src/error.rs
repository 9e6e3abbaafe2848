//! Error types for web handlers.
//!
//! This module maps core failures onto HTTP responses. Cryptographic and
//! structural token failures arrive already folded into
//! [`VerificationFailure::InvalidToken`]; nothing here adds detail back.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use qrpass_core::{AttendanceError, VerificationFailure};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse`, rendering a JSON body
/// `{"code": ..., "message": ...}`.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Sent as `Retry-After` when present
    retry_after: Option<Duration>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            retry_after: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 429 Too Many Requests error.
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please slow down".to_string(),
            "RATE_LIMITED".to_string(),
        );
        err.retry_after = Some(retry_after);
        err
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    let rounded = if retry_after.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    };
    rounded.max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(retry_after) = self.retry_after {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }
        response
    }
}

impl From<VerificationFailure> for AppError {
    fn from(failure: VerificationFailure) -> Self {
        let (status, code) = match failure {
            VerificationFailure::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            VerificationFailure::WrongEvent => (StatusCode::FORBIDDEN, "WRONG_EVENT"),
            VerificationFailure::Expired => (StatusCode::GONE, "TICKET_EXPIRED"),
        };
        Self::new(status, failure.to_string(), code.to_string())
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::AlreadyCheckedIn { .. } => Self::new(
                StatusCode::CONFLICT,
                err.to_string(),
                "ALREADY_CHECKED_IN".to_string(),
            ),
            AttendanceError::Unavailable(_) => {
                Self::unavailable("Attendance service unavailable")
                    .with_source(anyhow::Error::new(err))
            }
        }
    }
}

//! Guard Error Types
//!
//! This module provides request-guard error variants that integrate
//! with the unified `kernel::error::AppError` system.
//!
//! Client responses name the violation class only, never the rule that fired.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::rate_limit::RateLimitDecision;
use thiserror::Error;

/// Guard-specific result type alias
pub type GuardResult<T> = Result<T, GuardError>;

/// Why a request was blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    SqlInjection,
    CommandInjection,
    ScriptInjection,
    PathTraversal,
    RequestTooLarge,
    TooManyFields,
    MethodNotAllowed,
    MaliciousFile,
}

impl ViolationKind {
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::SqlInjection => "SQL_INJECTION",
            ViolationKind::CommandInjection => "COMMAND_INJECTION",
            ViolationKind::ScriptInjection => "XSS",
            ViolationKind::PathTraversal => "PATH_TRAVERSAL",
            ViolationKind::RequestTooLarge => "REQUEST_TOO_LARGE",
            ViolationKind::TooManyFields => "TOO_MANY_FIELDS",
            ViolationKind::MethodNotAllowed => "INVALID_METHOD",
            ViolationKind::MaliciousFile => "MALICIOUS_FILE",
        }
    }
}

/// Why an upload was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    TooLarge,
    FilenameTooLong,
    BlockedExtension(String),
}

impl UploadRejection {
    pub fn code(&self) -> &'static str {
        match self {
            UploadRejection::TooLarge => "FILE_TOO_LARGE",
            UploadRejection::FilenameTooLong => "FILENAME_TOO_LONG",
            UploadRejection::BlockedExtension(_) => "BLOCKED_EXTENSION",
        }
    }
}

/// Guard-specific error variants
#[derive(Debug, Error)]
pub enum GuardError {
    /// Rate limit exceeded; carries the decision for the response headers
    #[error("Rate limit exceeded, retry after {}s", .0.retry_after.unwrap_or(1))]
    RateLimitExceeded(RateLimitDecision),

    #[error("Security violation: {}", .kind.code())]
    SecurityViolation { kind: ViolationKind },

    #[error("File upload rejected: {}", .reason.code())]
    FileUploadRejected { reason: UploadRejection },

    #[error("CSRF token invalid or expired")]
    CsrfInvalid,

    /// Body could not be read
    #[error("Malformed request: {0}")]
    BadRequest(String),
}

impl GuardError {
    pub fn violation(kind: ViolationKind) -> Self {
        GuardError::SecurityViolation { kind }
    }

    pub fn upload(reason: UploadRejection) -> Self {
        GuardError::FileUploadRejected { reason }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::FORBIDDEN)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::RateLimitExceeded(_) => ErrorKind::TooManyRequests,
            GuardError::SecurityViolation { .. }
            | GuardError::FileUploadRejected { .. }
            | GuardError::CsrfInvalid => ErrorKind::Forbidden,
            GuardError::BadRequest(_) => ErrorKind::BadRequest,
        }
    }

    /// Machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::RateLimitExceeded(_) => "RATE_LIMIT_EXCEEDED",
            GuardError::SecurityViolation { kind } => kind.code(),
            GuardError::FileUploadRejected { reason } => reason.code(),
            GuardError::CsrfInvalid => "CSRF_INVALID",
            GuardError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            GuardError::RateLimitExceeded(_) => "Too many requests",
            GuardError::SecurityViolation { .. } | GuardError::FileUploadRejected { .. } => {
                "Request blocked by security filter"
            }
            GuardError::CsrfInvalid => "Invalid CSRF token",
            GuardError::BadRequest(_) => "Malformed request",
        };
        AppError::new(self.kind(), message).with_code(self.code())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            GuardError::RateLimitExceeded(decision) => {
                tracing::warn!(
                    class = %decision.class,
                    retry_after = decision.retry_after,
                    "Rate limit exceeded"
                );
            }
            GuardError::SecurityViolation { kind } => {
                tracing::error!(target: "security", code = kind.code(), "Request blocked");
            }
            GuardError::FileUploadRejected { reason } => {
                tracing::warn!(target: "security", code = reason.code(), "Upload rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Guard error");
            }
        }
    }
}

/// `X-RateLimit-*` headers for a decision
pub fn rate_limit_headers(decision: &RateLimitDecision) -> [(&'static str, HeaderValue); 3] {
    [
        ("x-ratelimit-limit", HeaderValue::from(decision.limit)),
        ("x-ratelimit-remaining", HeaderValue::from(decision.remaining)),
        ("x-ratelimit-reset", HeaderValue::from(decision.reset_at)),
    ]
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        self.log();
        let mut response = self.to_app_error().into_response();

        if let GuardError::RateLimitExceeded(decision) = &self {
            let headers = response.headers_mut();
            for (name, value) in rate_limit_headers(decision) {
                headers.insert(name, value);
            }
            headers.insert(
                header::RETRY_AFTER,
                HeaderValue::from(decision.retry_after.unwrap_or(1)),
            );
        }

        response
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        err.to_app_error()
    }
}

//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordPolicyError;
use thiserror::Error;

use crate::domain::token_codec::TokenError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password or unreadable stored hash
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is locked (flag set or too many failed attempts)
    #[error("Account is locked")]
    AccountLocked,

    /// Email verification is required before signing in
    #[error("Email address has not been verified")]
    EmailNotVerified,

    /// Email already registered
    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid email address")]
    InvalidEmail,

    /// Other invalid registration input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Password does not satisfy the policy for new credentials
    #[error("Password validation failed: {0}")]
    PasswordPolicy(#[from] PasswordPolicyError),

    /// Bearer token missing
    #[error("Authentication required")]
    MissingToken,

    /// Bearer token rejected
    #[error("Invalid token: {0}")]
    Token(#[from] TokenError),

    /// Token subject no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::Token(_) => ErrorKind::Unauthorized,
            AuthError::AccountLocked | AuthError::EmailNotVerified => ErrorKind::Forbidden,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::InvalidEmail | AuthError::InvalidInput(_) | AuthError::PasswordPolicy(_) => {
                ErrorKind::BadRequest
            }
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::Repository(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountLocked => "ACCOUNT_LOCKED",
            AuthError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AuthError::EmailTaken => "EMAIL_TAKEN",
            AuthError::InvalidEmail => "INVALID_EMAIL",
            AuthError::InvalidInput(_) => "INVALID_INPUT",
            AuthError::PasswordPolicy(_) => "WEAK_PASSWORD",
            AuthError::MissingToken => "AUTH_REQUIRED",
            AuthError::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            AuthError::Token(_) => "TOKEN_INVALID",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::Repository(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to AppError
    ///
    /// Token failures share one client message; the exact stage stays in logs.
    pub fn to_app_error(&self) -> AppError {
        let message = match self {
            AuthError::Token(TokenError::Expired) => "Token has expired".to_string(),
            AuthError::Token(_) => "Invalid token".to_string(),
            other => other.to_string(),
        };
        AppError::new(self.kind(), message).with_code(self.code())
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Repository(msg) => {
                tracing::error!(message = %msg, "Auth repository error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked => {
                tracing::warn!("Login attempt on locked account");
            }
            AuthError::Token(TokenError::SignatureInvalid) => {
                tracing::warn!("Token signature rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

//! Shared Kernel - Cross-crate error vocabulary
//!
//! The smallest core shared by the security crates:
//! - [`error::kind::ErrorKind`] classifies failures and maps them to HTTP status codes
//! - [`error::app_error::AppError`] is the single transport-level error every
//!   crate-specific error converts into before leaving the process
//!
//! Nothing here knows about tokens, passwords or rate limits; those crates own
//! their own `thiserror` enums and only meet here at the HTTP boundary.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}

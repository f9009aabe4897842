//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Token codec, claims, user record, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Repository implementations
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Sign-up / sign-in with email + password
//! - Stateless HS256 session tokens (bearer header or cookie)
//! - Token refresh with optional "remember me" lifetime
//! - Role-based claims (Individual, Business, Admin)
//!
//! ## Security Model
//! - Passwords verified against Argon2 PHC strings or PBKDF2 envelopes
//! - Unknown email and wrong password are indistinguishable to clients
//! - Lockout after repeated failed sign-ins
//! - Issuer/audience bound tokens with algorithm pinning

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use domain::{Claims, TokenCodec, TokenError};
pub use error::{AuthError, AuthResult};
pub use infra::memory::InMemoryUserRepository;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::user::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}

#[cfg(test)]
mod tests;

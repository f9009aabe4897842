//! Guard (Request Security) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Attack signatures, input scanning, uploads, CSRF, headers
//! - `application/` - Guard configuration and the per-request orchestrator
//! - `presentation/` - Middleware, handlers, DTOs, router
//!
//! ## Pipeline
//! Every request passes, in order:
//! 1. HTTP method allow-list
//! 2. Declared and buffered body size
//! 3. Input field count (query, body, cookies)
//! 4. Signature scan; SQL and command injection abort with 403
//! 5. Upload validation (size, name, extension, content markers)
//! 6. Optional CSRF check on state-changing methods
//! 7. Rate limiting per IP, per authenticated user and globally
//!
//! Hardening headers are added to every response.

pub mod application;
pub mod domain;
pub mod error;
pub mod presentation;

// Re-exports for convenience
pub use application::config::GuardConfig;
pub use application::guard::RequestGuard;
pub use domain::signatures::AttackFamily;
pub use error::{GuardError, GuardResult, UploadRejection, ViolationKind};
pub use presentation::middleware::GuardContext;
pub use presentation::router::{guard_layer, security_router};

#[cfg(test)]
mod tests;

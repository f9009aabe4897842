//! Presentation Layer
//!
//! HTTP middleware, handlers, DTOs, and router.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::GuardAppState;
pub use middleware::{CSRF_HEADER, GuardContext, guard_request};
pub use router::{guard_layer, security_router};

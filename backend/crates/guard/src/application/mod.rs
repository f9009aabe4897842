//! Application Layer
//!
//! Guard configuration and the per-request orchestrator.

pub mod config;
pub mod guard;

pub use config::GuardConfig;
pub use guard::{RequestGuard, csrf_session_id};

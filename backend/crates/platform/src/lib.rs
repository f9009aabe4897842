//! Platform Crate - Security Infrastructure
//!
//! This crate provides the stateless and storage-level building blocks of the
//! authentication & request-security subsystem:
//! - Cryptographic utilities (HMAC-SHA256, Base64/Base64url, constant-time compare)
//! - Password verification across the PHC and PBKDF2-envelope formats
//! - Session cookie construction
//! - Client IP resolution behind proxies
//! - Sliding-window rate limiting over pluggable counter stores

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;

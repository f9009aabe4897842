//! Application Configuration
//!
//! Configuration for the request guard.

use std::time::Duration;

use axum::http::Method;

use crate::domain::signatures::AttackFamily;

/// Minimum CSRF secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Request guard configuration
#[derive(Clone)]
pub struct GuardConfig {
    /// Maximum declared or buffered body size
    pub max_body_bytes: usize,
    /// Maximum number of query, body and cookie fields
    pub max_input_fields: usize,
    /// Nesting depth beyond which JSON values are not scanned
    pub max_scan_depth: usize,
    /// Maximum upload filename length in bytes
    pub max_filename_len: usize,
    /// Maximum size of one uploaded file
    pub max_file_bytes: usize,
    /// Bytes of each upload inspected for script markers
    pub content_scan_bytes: usize,
    /// Upload extensions refused outright (lowercase, no dot)
    pub blocked_extensions: Vec<String>,
    /// Methods accepted at all
    pub allowed_methods: Vec<Method>,
    /// Attack families that abort the request; the rest are only logged
    pub blocking_families: Vec<AttackFamily>,
    /// HMAC key for CSRF tokens
    pub csrf_secret: Vec<u8>,
    /// CSRF token lifetime
    pub csrf_lifetime: Duration,
    /// Whether TLS is terminated by this process
    pub tls: bool,
    /// Whether unsafe methods must carry a valid `X-CSRF-Token`
    pub require_csrf: bool,
    /// Cookie carrying the session token, used to attribute requests to a user
    pub session_cookie_name: String,
}

impl std::fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardConfig")
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_input_fields", &self.max_input_fields)
            .field("max_scan_depth", &self.max_scan_depth)
            .field("blocked_extensions", &self.blocked_extensions)
            .field("allowed_methods", &self.allowed_methods)
            .field("blocking_families", &self.blocking_families)
            .field("csrf_secret", &"[REDACTED]")
            .field("csrf_lifetime", &self.csrf_lifetime)
            .field("tls", &self.tls)
            .field("require_csrf", &self.require_csrf)
            .finish_non_exhaustive()
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            max_input_fields: 1000,
            max_scan_depth: 10,
            max_filename_len: 255,
            max_file_bytes: 10 * 1024 * 1024,
            content_scan_bytes: 8192,
            blocked_extensions: ["php", "js", "html", "exe", "bat", "cmd"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            blocking_families: vec![AttackFamily::SqlInjection, AttackFamily::CommandInjection],
            csrf_secret: Vec::new(),
            csrf_lifetime: Duration::from_secs(3600),
            tls: false,
            require_csrf: false,
            session_cookie_name: "auth_token".to_string(),
        }
    }
}

impl GuardConfig {
    /// Create config with a random CSRF secret
    pub fn with_random_secret() -> Self {
        Self {
            csrf_secret: platform::crypto::random_bytes(MIN_SECRET_LEN),
            ..Default::default()
        }
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::with_random_secret()
    }

    /// Set the CSRF secret
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.csrf_secret = secret.into();
        self
    }

    pub fn has_strong_secret(&self) -> bool {
        self.csrf_secret.len() >= MIN_SECRET_LEN
    }

    pub fn is_method_allowed(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    pub fn is_blocking(&self, family: AttackFamily) -> bool {
        self.blocking_families.contains(&family)
    }

    /// Whether `extension` (any case, with or without dot) is refused
    pub fn is_blocked_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.blocked_extensions.iter().any(|e| *e == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_input_fields, 1000);
        assert!(!config.has_strong_secret());
        assert!(config.is_blocking(AttackFamily::SqlInjection));
        assert!(!config.is_blocking(AttackFamily::ScriptInjection));
        assert!(!config.is_method_allowed(&Method::TRACE));
    }

    #[test]
    fn test_blocked_extension_case_insensitive() {
        let config = GuardConfig::development();
        assert!(config.has_strong_secret());
        assert!(config.is_blocked_extension("PHP"));
        assert!(config.is_blocked_extension(".exe"));
        assert!(!config.is_blocked_extension("png"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = GuardConfig::default().with_secret(vec![7u8; 32]);
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("7, 7"));
    }
}

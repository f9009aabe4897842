//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;

use crate::domain::token_codec::{
    DEFAULT_AUDIENCE, DEFAULT_ISSUER, LONG_TTL_SECS, SHORT_TTL_SECS, TokenCodec,
};

/// Minimum secret length accepted for HS256 signing
pub const MIN_SECRET_LEN: usize = 32;

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key for session tokens
    pub token_secret: Vec<u8>,
    /// `iss` stamped into and required from tokens
    pub issuer: String,
    /// `aud` stamped into and required from tokens
    pub audience: String,
    /// Token TTL without "Remember Me" (1 day)
    pub token_ttl_short: Duration,
    /// Token TTL with "Remember Me" (30 days)
    pub token_ttl_long: Duration,
    /// Session cookie name
    pub cookie_name: String,
    /// Frontend is served from another site (SameSite=None; Partitioned)
    pub cross_site_cookies: bool,
    /// TLS terminates in this process
    pub tls: bool,
    /// Refuse sign-in until the email is verified
    pub require_email_verification: bool,
    /// Rewrite legacy hashes with the current parameters after a good sign-in
    pub rehash_legacy_on_login: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("token_ttl_short", &self.token_ttl_short)
            .field("token_ttl_long", &self.token_ttl_long)
            .field("cookie_name", &self.cookie_name)
            .field("cross_site_cookies", &self.cross_site_cookies)
            .field("tls", &self.tls)
            .field("require_email_verification", &self.require_email_verification)
            .field("rehash_legacy_on_login", &self.rehash_legacy_on_login)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: Vec::new(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            token_ttl_short: Duration::from_secs(SHORT_TTL_SECS as u64),
            token_ttl_long: Duration::from_secs(LONG_TTL_SECS as u64),
            cookie_name: "auth_token".to_string(),
            cross_site_cookies: false,
            tls: false,
            require_email_verification: false,
            rehash_legacy_on_login: false,
        }
    }
}

impl AuthConfig {
    /// Create config with a random token secret
    pub fn with_random_secret() -> Self {
        Self {
            token_secret: platform::crypto::random_bytes(MIN_SECRET_LEN),
            ..Default::default()
        }
    }

    /// Create config for development
    pub fn development() -> Self {
        Self::with_random_secret()
    }

    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.token_secret = secret.into();
        self
    }

    /// Whether the secret is long enough to sign with
    pub fn has_strong_secret(&self) -> bool {
        self.token_secret.len() >= MIN_SECRET_LEN
    }

    /// Token codec bound to this deployment's secret, issuer and audience
    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(self.token_secret.clone())
            .with_issuer(&self.issuer, &self.audience)
            .with_ttl(
                self.token_ttl_short.as_secs() as i64,
                self.token_ttl_long.as_secs() as i64,
            )
    }

    /// Cookie policy for a request (`encrypted` per X-Forwarded-Proto or TLS)
    pub fn cookie(&self, encrypted: bool) -> CookieConfig {
        CookieConfig::session(&self.cookie_name, encrypted || self.tls, self.cross_site_cookies)
    }
}

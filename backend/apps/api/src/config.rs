//! Server Configuration
//!
//! Settings read from the environment (after `.env` is loaded).
//! Development mode fills in random secrets and relaxed limits.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use auth::AuthConfig;
use guard::GuardConfig;
use platform::rate_limit::RateLimitPolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";
const DEFAULT_RATE_LIMIT_DIR: &str = "./data/rate_limits";

/// Server settings
#[derive(Debug)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    /// Shared counter store; the file store is used alone when unset
    pub redis_url: Option<String>,
    pub rate_limit_dir: PathBuf,
    pub auth: AuthConfig,
    pub guard: GuardConfig,
    pub rate_limit: RateLimitPolicy,
    pub development: bool,
}

impl Settings {
    /// Load settings from environment variables
    ///
    /// ## Errors
    /// Fails outside development mode when a secret is missing, not base64,
    /// or shorter than 32 bytes.
    pub fn from_env() -> anyhow::Result<Self> {
        let development = match env::var("APP_ENV") {
            Ok(value) => value.eq_ignore_ascii_case("development"),
            Err(_) => cfg!(debug_assertions),
        };

        let bind_addr = var_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .context("BIND_ADDR is not a socket address")?;

        let frontend_origins = var_or("FRONTEND_ORIGINS", DEFAULT_FRONTEND_ORIGINS)
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let cross_site = flag("CROSS_SITE_COOKIES");

        let mut auth = if development {
            AuthConfig::development()
        } else {
            AuthConfig::default().with_secret(secret("TOKEN_SECRET")?)
        };
        if let Ok(issuer) = env::var("TOKEN_ISSUER") {
            auth.issuer = issuer;
        }
        if let Ok(audience) = env::var("TOKEN_AUDIENCE") {
            auth.audience = audience;
        }
        auth.cross_site_cookies = cross_site;

        let guard = if development {
            GuardConfig::development()
        } else {
            GuardConfig::default().with_secret(secret("CSRF_SECRET")?)
        };
        let guard = GuardConfig {
            session_cookie_name: auth.cookie_name.clone(),
            require_csrf: flag("REQUIRE_CSRF"),
            ..guard
        };

        let rate_limit = if development {
            RateLimitPolicy::development()
        } else {
            RateLimitPolicy::default()
        };

        Ok(Self {
            bind_addr,
            frontend_origins,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            rate_limit_dir: var_or("RATE_LIMIT_DIR", DEFAULT_RATE_LIMIT_DIR).into(),
            auth,
            guard,
            rate_limit,
            development,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Base64 secret of at least 32 bytes
fn secret(name: &str) -> anyhow::Result<Vec<u8>> {
    let encoded = env::var(name).with_context(|| format!("{name} must be set in production"))?;
    let bytes = platform::crypto::from_base64(encoded.trim())
        .with_context(|| format!("{name} is not valid base64"))?;
    if bytes.len() < 32 {
        bail!("{name} must decode to at least 32 bytes");
    }
    Ok(bytes)
}

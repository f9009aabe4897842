//! CSRF tokens
//!
//! Stateless tokens of the form `{issued_at}.{nonce}.{mac}` where the MAC is
//! HMAC-SHA256 over `{session_id}.{issued_at}.{nonce}`. A token is only
//! valid for the session it was issued to and only within its lifetime.

use std::time::Duration;

use platform::crypto::{constant_time_eq, from_base64url, hmac_sha256, random_hex, to_base64url};

use crate::error::{GuardError, GuardResult};

const NONCE_BYTES: usize = 16;

/// Issued token and its expiry (unix seconds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and validates session-bound CSRF tokens
#[derive(Clone)]
pub struct CsrfProtector {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl std::fmt::Debug for CsrfProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfProtector")
            .field("secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl CsrfProtector {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            lifetime,
        }
    }

    fn mac(&self, session_id: &str, issued_at: i64, nonce: &str) -> [u8; 32] {
        hmac_sha256(
            &self.secret,
            format!("{session_id}.{issued_at}.{nonce}").as_bytes(),
        )
    }

    /// Issue a token bound to `session_id`
    pub fn issue(&self, session_id: &str) -> CsrfToken {
        self.issue_at(session_id, chrono::Utc::now().timestamp())
    }

    pub fn issue_at(&self, session_id: &str, now: i64) -> CsrfToken {
        let nonce = random_hex(NONCE_BYTES);
        let mac = self.mac(session_id, now, &nonce);
        CsrfToken {
            token: format!("{now}.{nonce}.{}", to_base64url(&mac)),
            expires_at: now + self.lifetime.as_secs() as i64,
        }
    }

    /// Validate `token` for `session_id`
    pub fn validate(&self, token: &str, session_id: &str) -> GuardResult<()> {
        self.validate_at(token, session_id, chrono::Utc::now().timestamp())
    }

    pub fn validate_at(&self, token: &str, session_id: &str, now: i64) -> GuardResult<()> {
        let mut parts = token.split('.');
        let (Some(issued_at), Some(nonce), Some(mac), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(GuardError::CsrfInvalid);
        };

        let issued_at: i64 = issued_at.parse().map_err(|_| GuardError::CsrfInvalid)?;
        let supplied = from_base64url(mac).map_err(|_| GuardError::CsrfInvalid)?;

        let expected = self.mac(session_id, issued_at, nonce);
        if !constant_time_eq(&expected, &supplied) {
            tracing::debug!("CSRF token does not match session");
            return Err(GuardError::CsrfInvalid);
        }

        if issued_at > now || now - issued_at > self.lifetime.as_secs() as i64 {
            tracing::debug!(issued_at, now, "CSRF token expired");
            return Err(GuardError::CsrfInvalid);
        }

        Ok(())
    }
}

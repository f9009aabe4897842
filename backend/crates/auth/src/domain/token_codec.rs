//! Token Codec
//!
//! Compact HS256 tokens: `base64url(header).base64url(payload).base64url(mac)`.
//!
//! Verification runs in fixed order and stops at the first failure:
//! structure, MAC over the raw segments, JSON, algorithm, then time and
//! issuer/audience claims. Nothing from an unverified payload is returned
//! except through [`TokenCodec::peek_unverified`].

use chrono::Utc;
use kernel::error::kind::ErrorKind;
use platform::crypto::{constant_time_eq, from_base64url, hmac_sha256, to_base64url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::claims::Claims;
use crate::domain::user::UserRecord;

/// The only accepted algorithm
pub const ALGORITHM: &str = "HS256";
pub const TOKEN_TYPE: &str = "JWT";

pub const DEFAULT_ISSUER: &str = "economia-circular-canarias";
pub const DEFAULT_AUDIENCE: &str = "ecc-web-app";

/// Lifetime of a regular session token (1 day)
pub const SHORT_TTL_SECS: i64 = 24 * 60 * 60;
/// Lifetime of a "remember me" token (30 days)
pub const LONG_TTL_SECS: i64 = 30 * 24 * 60 * 60;

pub type TokenResult<T> = Result<T, TokenError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token issuer or audience does not match")]
    ClaimMismatch,
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::Malformed => ErrorKind::BadRequest,
            _ => ErrorKind::Unauthorized,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    alg: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            typ: Some(TOKEN_TYPE.to_string()),
            alg: ALGORITHM.to_string(),
        }
    }
}

/// Sign `claims` with `secret`
///
/// ## Returns
/// The compact token, or `Malformed` when `exp` is not after `iat` or an
/// extra claim reuses a reserved name
pub fn encode(claims: &Claims, secret: &[u8]) -> TokenResult<String> {
    if claims.exp <= claims.iat || claims.has_reserved_extra() {
        return Err(TokenError::Malformed);
    }

    let header = serde_json::to_vec(&Header::hs256()).map_err(|_| TokenError::Malformed)?;
    let payload = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;

    let signing_input = format!("{}.{}", to_base64url(&header), to_base64url(&payload));
    let mac = hmac_sha256(secret, signing_input.as_bytes());

    Ok(format!("{}.{}", signing_input, to_base64url(&mac)))
}

/// Verify `token` against `secret` at `now` (unix seconds)
///
/// Issuer and audience are not checked here; see [`TokenCodec::decode_at`].
pub fn decode(token: &str, secret: &[u8], now: i64) -> TokenResult<Claims> {
    let (header_b64, payload_b64, mac_b64) = split(token)?;

    let mac = from_base64url(mac_b64).map_err(|_| TokenError::SignatureInvalid)?;
    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
    let expected = hmac_sha256(secret, signing_input.as_bytes());
    if !constant_time_eq(&mac, &expected) {
        return Err(TokenError::SignatureInvalid);
    }

    let header: Header = decode_segment(header_b64)?;
    if header.alg != ALGORITHM {
        return Err(TokenError::SignatureInvalid);
    }

    let claims: Claims = decode_segment(payload_b64)?;
    if claims.exp < now {
        return Err(TokenError::Expired);
    }
    if claims.nbf > now {
        return Err(TokenError::NotYetValid);
    }

    Ok(claims)
}

fn split(token: &str) -> TokenResult<(&str, &str, &str)> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty() => {
            Ok((h, p, s))
        }
        _ => Err(TokenError::Malformed),
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> TokenResult<T> {
    let bytes = from_base64url(segment).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// Issues and verifies session tokens for one deployment
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    issuer: Option<String>,
    audience: Option<String>,
    short_ttl: i64,
    long_ttl: i64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("short_ttl", &self.short_ttl)
            .field("long_ttl", &self.long_ttl)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
            short_ttl: SHORT_TTL_SECS,
            long_ttl: LONG_TTL_SECS,
        }
    }

    /// Stamp and require `iss`/`aud`
    pub fn with_issuer(mut self, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self.audience = Some(audience.into());
        self
    }

    pub fn with_ttl(mut self, short_ttl: i64, long_ttl: i64) -> Self {
        self.short_ttl = short_ttl;
        self.long_ttl = long_ttl;
        self
    }

    /// Lifetime in seconds for a session with or without "remember me"
    pub fn ttl(&self, remember_me: bool) -> i64 {
        if remember_me {
            self.long_ttl
        } else {
            self.short_ttl
        }
    }

    pub fn encode(&self, claims: &Claims) -> TokenResult<String> {
        encode(claims, &self.secret)
    }

    pub fn decode(&self, token: &str) -> TokenResult<Claims> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Full verification including issuer and audience
    pub fn decode_at(&self, token: &str, now: i64) -> TokenResult<Claims> {
        let claims = decode(token, &self.secret, now)?;

        if let (Some(expected), Some(actual)) = (&self.issuer, &claims.iss)
            && expected != actual
        {
            return Err(TokenError::ClaimMismatch);
        }
        if let (Some(expected), Some(actual)) = (&self.audience, &claims.aud)
            && expected != actual
        {
            return Err(TokenError::ClaimMismatch);
        }

        Ok(claims)
    }

    pub fn refresh(&self, token: &str, extend_expiration: bool) -> TokenResult<(String, Claims)> {
        self.refresh_at(token, extend_expiration, Utc::now().timestamp())
    }

    /// Re-issue a valid token with fresh `iat`/`jti`
    ///
    /// ## Arguments
    /// * `extend_expiration` - restart the lifetime from `now`; otherwise
    ///   the original `exp` is kept
    pub fn refresh_at(
        &self,
        token: &str,
        extend_expiration: bool,
        now: i64,
    ) -> TokenResult<(String, Claims)> {
        let mut claims = self.decode_at(token, now)?;

        claims.iat = now;
        claims.nbf = now;
        claims.jti = Uuid::new_v4().to_string();
        if extend_expiration {
            claims.exp = now + self.ttl(claims.remember_me);
        }

        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    pub fn issue_for(&self, user: &UserRecord, remember_me: bool) -> TokenResult<(String, Claims)> {
        self.issue_for_at(user, remember_me, Utc::now().timestamp())
    }

    /// Build and sign the session claims for `user`
    pub fn issue_for_at(
        &self,
        user: &UserRecord,
        remember_me: bool,
        now: i64,
    ) -> TokenResult<(String, Claims)> {
        let mut claims = Claims::new(
            user.id.as_str(),
            now,
            now + self.ttl(remember_me),
            Uuid::new_v4().to_string(),
        );
        claims.iss = self.issuer.clone();
        claims.aud = self.audience.clone();
        claims.email = Some(user.email.as_str().to_string());
        claims.given_name = Some(user.first_name.clone());
        claims.family_name = Some(user.last_name.clone());
        claims.role = Some(user.role.code().to_string());
        claims.island = user.island.map(|island| island.to_string());
        claims.city = user.city.clone();
        claims.email_verified = user.email_verified;
        claims.remember_me = remember_me;

        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Read the payload without any verification
    ///
    /// Diagnostics only. Never use the result to authenticate.
    pub fn peek_unverified(token: &str) -> Option<Claims> {
        let (_, payload, _) = split(token).ok()?;
        decode_segment(payload).ok()
    }
}

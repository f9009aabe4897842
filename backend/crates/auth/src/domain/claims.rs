//! Token Claims
//!
//! Registered claims (RFC 7519) plus the marketplace's application claims.
//! Unknown claims survive a decode/encode cycle through `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names owned by named fields; never valid as keys of `extra`
pub const RESERVED_CLAIMS: [&str; 15] = [
    "iss",
    "aud",
    "iat",
    "exp",
    "nbf",
    "jti",
    "sub",
    "email",
    "given_name",
    "family_name",
    "role",
    "island",
    "city",
    "email_verified",
    "remember_me",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Not before (unix seconds)
    pub nbf: i64,
    /// Token id; unique per issue, never checked for replay
    pub jti: String,
    /// User id
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub island: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    /// Selects the long-lived window on refresh
    #[serde(default)]
    pub remember_me: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Minimal claims for `sub`, valid from `iat` until `exp`
    pub fn new(sub: impl Into<String>, iat: i64, exp: i64, jti: impl Into<String>) -> Self {
        Self {
            iss: None,
            aud: None,
            iat,
            exp,
            nbf: iat,
            jti: jti.into(),
            sub: sub.into(),
            email: None,
            given_name: None,
            family_name: None,
            role: None,
            island: None,
            city: None,
            email_verified: false,
            remember_me: false,
            extra: Map::new(),
        }
    }

    /// Whether `extra` shadows a named claim
    ///
    /// Serializing such claims would emit the key twice.
    pub fn has_reserved_extra(&self) -> bool {
        RESERVED_CLAIMS.iter().any(|name| self.extra.contains_key(*name))
    }

    /// Seconds until expiry at `now` (negative once expired)
    pub fn expires_in(&self, now: i64) -> i64 {
        self.exp - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_claims_are_omitted() {
        let claims = Claims::new("42", 1_000, 4_600, "jti-1");
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["sub"], "42");
        assert_eq!(json["nbf"], 1_000);
        assert!(json.get("iss").is_none());
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_unknown_claims_are_preserved() {
        let json = r#"{"sub":"7","iat":1,"exp":2,"nbf":1,"jti":"x","tenant":"lp","user_agent":"curl"}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.extra["tenant"], "lp");
        let back = serde_json::to_value(&claims).unwrap();
        assert_eq!(back["user_agent"], "curl");
    }

    #[test]
    fn test_reserved_extra_detected() {
        let mut claims = Claims::new("42", 1_000, 4_600, "jti-1");
        claims.extra.insert("tenant".to_string(), Value::from("lp"));
        assert!(!claims.has_reserved_extra());

        claims.extra.insert("email".to_string(), Value::from("x@example.com"));
        assert!(claims.has_reserved_extra());
    }

    #[test]
    fn test_missing_registered_claim_fails() {
        let json = r#"{"sub":"7","iat":1,"exp":2,"jti":"x"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
    }
}

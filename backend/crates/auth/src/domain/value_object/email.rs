//! Email Value Object
//!
//! Login identifier. Stored lowercased so lookups are case-insensitive.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AuthError;

/// Maximum email length (per RFC 5321)
const EMAIL_MAX_LENGTH: usize = 254;
const LOCAL_PART_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct Email(String);

impl Email {
    /// Normalize and validate a user-supplied address
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let email = raw.trim().to_lowercase();

        if email.is_empty() || email.len() > EMAIL_MAX_LENGTH {
            return Err(AuthError::InvalidEmail);
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Err(AuthError::InvalidEmail);
        };

        let local_ok = !local.is_empty()
            && local.len() <= LOCAL_PART_MAX_LENGTH
            && !local.chars().any(|c| c.is_whitespace() || c.is_control());

        let domain_ok = domain.contains('.')
            && !domain.contains('@')
            && !domain.contains("..")
            && domain
                .split('.')
                .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

        if !(local_ok && domain_ok) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(Self(email))
    }

    /// Create from a stored value (assumed already validated)
    #[inline]
    pub fn from_db(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Email {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Email::parse(s)
    }
}

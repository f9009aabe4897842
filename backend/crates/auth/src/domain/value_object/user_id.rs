use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identifier, carried as the token `sub` claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct UserId(String);

impl UserId {
    /// Fresh random identifier for a new account
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn from_db<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

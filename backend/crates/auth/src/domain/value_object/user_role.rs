use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace account type, carried as the token `role` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Private buyer/seller
    #[default]
    Individual,
    /// Registered business selling on the marketplace
    Business,
    Admin,
}

impl UserRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            Individual => "individual",
            Business => "business",
            Admin => "admin",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        use UserRole::*;
        match code {
            // Older records used "user" for private accounts
            "individual" | "user" => Ok(Individual),
            "business" => Ok(Business),
            "admin" => Ok(Admin),
            other => Err(format!("invalid user role: {other}")),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

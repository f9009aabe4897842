//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::domain::claims::Claims;
use crate::domain::user::UserRecord;

// ============================================================================
// Shared
// ============================================================================

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: String,
    pub island: Option<String>,
    pub city: Option<String>,
    pub email_verified: bool,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            role: user.role.to_string(),
            island: user.island.map(|island| island.to_string()),
            city: user.city.clone(),
            email_verified: user.email_verified,
        }
    }
}

/// Issued token and its lifetime
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    /// Unix seconds
    pub expires_at: i64,
}

impl TokenResponse {
    pub fn new(token: String, claims: &Claims) -> Self {
        Self {
            token,
            expires_at: claims.exp,
        }
    }
}

// ============================================================================
// Sign In
// ============================================================================

/// Sign in request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Sign in response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub token: TokenResponse,
}

// ============================================================================
// Sign Up
// ============================================================================

/// Sign up request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Accepted under the legacy `userType` name as well
    #[serde(default, alias = "userType")]
    pub role: Option<String>,
    #[serde(default)]
    pub island: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Sign up response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub user: UserResponse,
    pub requires_email_confirmation: bool,
    #[serde(flatten)]
    pub token: Option<TokenResponse>,
}

// ============================================================================
// Refresh
// ============================================================================

/// Refresh request; the token itself travels as bearer or cookie
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub extend_expiration: bool,
}

// ============================================================================
// Validate / Me
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub user_id: String,
    pub role: Option<String>,
    pub expires_at: i64,
}

impl From<&Claims> for ValidateResponse {
    fn from(claims: &Claims) -> Self {
        Self {
            valid: true,
            user_id: claims.sub.clone(),
            role: claims.role.clone(),
            expires_at: claims.exp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserResponse,
    pub expires_at: i64,
}

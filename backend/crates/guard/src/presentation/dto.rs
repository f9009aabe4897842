//! API DTOs (Data Transfer Objects)

use platform::rate_limit::{LimitClass, RateLimitStats};
use serde::Serialize;

/// Response for GET /api/security/csrf-token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub token: String,
    /// Unix seconds
    pub expires_at: i64,
    /// Header the token must be sent in
    pub header_name: &'static str,
}

/// One class in GET /api/security/rate-limit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitClassResponse {
    pub class: LimitClass,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
    pub window_secs: u64,
}

impl From<RateLimitStats> for RateLimitClassResponse {
    fn from(stats: RateLimitStats) -> Self {
        Self {
            class: stats.class,
            limit: stats.limit,
            remaining: stats.remaining,
            reset_at: stats.reset_at,
            window_secs: stats.window_secs,
        }
    }
}

/// Response for GET /api/security/rate-limit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatusResponse {
    pub identifier: String,
    pub limits: Vec<RateLimitClassResponse>,
}

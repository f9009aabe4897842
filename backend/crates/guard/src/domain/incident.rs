//! Security incidents
//!
//! Structured records of signature hits, written to the `security` tracing
//! target. Never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::scanner::Finding;
use super::signatures::AttackFamily;

/// Longest offending value kept in an incident, in characters
pub const MAX_VALUE_CHARS: usize = 100;

/// One detected attack attempt
#[derive(Debug, Clone, Serialize)]
pub struct SecurityIncident {
    #[serde(rename = "type")]
    pub family: AttackFamily,
    pub pattern: &'static str,
    pub key: String,
    pub value: String,
    pub ip: String,
    pub user_agent: String,
    pub request_uri: String,
    pub timestamp: DateTime<Utc>,
    pub blocked: bool,
}

/// Request attributes shared by every incident of one request
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip: String,
    pub user_agent: String,
    pub request_uri: String,
}

impl SecurityIncident {
    pub fn from_finding(finding: &Finding, origin: &RequestOrigin, blocked: bool) -> Self {
        Self {
            family: finding.family,
            pattern: finding.pattern,
            key: finding.key.clone(),
            value: truncate(&finding.value, MAX_VALUE_CHARS),
            ip: origin.ip.clone(),
            user_agent: origin.user_agent.clone(),
            request_uri: origin.request_uri.clone(),
            timestamp: Utc::now(),
            blocked,
        }
    }

    /// Emit to the `security` target
    pub fn log(&self) {
        if self.blocked {
            tracing::error!(
                target: "security",
                attack = %self.family,
                pattern = self.pattern,
                key = %self.key,
                value = %self.value,
                ip = %self.ip,
                user_agent = %self.user_agent,
                uri = %self.request_uri,
                "Security incident, request blocked"
            );
        } else {
            tracing::warn!(
                target: "security",
                attack = %self.family,
                pattern = self.pattern,
                key = %self.key,
                value = %self.value,
                ip = %self.ip,
                user_agent = %self.user_agent,
                uri = %self.request_uri,
                "Security incident"
            );
        }
    }
}

/// First `max_chars` characters of `value`
pub(crate) fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

//! Request Guard
//!
//! Transport-agnostic checks run on every request before business logic.
//! The HTTP middleware gathers the inputs and calls these in order:
//! method, declared size, field count, signature scan, uploads, rate limit.

use std::net::IpAddr;
use std::sync::Arc;

use auth::TokenCodec;
use auth::middleware::extract_token;
use axum::http::{HeaderMap, Method};
use platform::rate_limit::{CounterStore, LimitClass, RateLimitDecision, RateLimiter};

use crate::application::config::GuardConfig;
use crate::domain::csrf::{CsrfProtector, CsrfToken};
use crate::domain::incident::{MAX_VALUE_CHARS, RequestOrigin, SecurityIncident, truncate};
use crate::domain::inputs::RequestInputs;
use crate::domain::scanner::{Finding, InputScanner};
use crate::domain::signatures::SignatureRegistry;
use crate::domain::upload::{UploadPolicy, validate_upload};
use crate::error::{GuardError, GuardResult, ViolationKind};

/// Headers inspected for injected markup
const WATCHED_HEADERS: [&str; 5] = [
    "x-forwarded-for",
    "x-real-ip",
    "client-ip",
    "user-agent",
    "referer",
];

/// Request guard over a rate limiter backed by `S`
pub struct RequestGuard<S> {
    limiter: Arc<RateLimiter<S>>,
    config: Arc<GuardConfig>,
    csrf: CsrfProtector,
    scanner: InputScanner,
    /// Verifies bearer tokens to attribute requests to a user
    codec: Option<Arc<TokenCodec>>,
}

impl<S> Clone for RequestGuard<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            config: self.config.clone(),
            csrf: self.csrf.clone(),
            scanner: self.scanner,
            codec: self.codec.clone(),
        }
    }
}

impl<S> RequestGuard<S>
where
    S: CounterStore + Sync,
{
    pub fn new(limiter: Arc<RateLimiter<S>>, config: GuardConfig) -> Self {
        let csrf = CsrfProtector::new(config.csrf_secret.clone(), config.csrf_lifetime);
        let scanner = InputScanner::new(config.max_scan_depth);
        Self {
            limiter,
            config: Arc::new(config),
            csrf,
            scanner,
            codec: None,
        }
    }

    /// Attribute requests carrying a valid session token to its subject
    pub fn with_token_codec(mut self, codec: Arc<TokenCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    // ========================================================================
    // Structural limits
    // ========================================================================

    pub fn check_method(&self, method: &Method) -> GuardResult<()> {
        if self.config.is_method_allowed(method) {
            Ok(())
        } else {
            Err(GuardError::violation(ViolationKind::MethodNotAllowed))
        }
    }

    /// Reject a declared body larger than the limit
    pub fn check_declared_size(&self, content_length: Option<u64>) -> GuardResult<()> {
        match content_length {
            Some(len) if len > self.config.max_body_bytes as u64 => {
                Err(GuardError::violation(ViolationKind::RequestTooLarge))
            }
            _ => Ok(()),
        }
    }

    pub fn check_field_count(&self, inputs: &RequestInputs) -> GuardResult<()> {
        let count = inputs.field_count();
        if count > self.config.max_input_fields {
            tracing::warn!(count, max = self.config.max_input_fields, "Too many input fields");
            return Err(GuardError::violation(ViolationKind::TooManyFields));
        }
        Ok(())
    }

    // ========================================================================
    // Signature scan
    // ========================================================================

    /// Scan all inputs, log every finding and abort on a blocking family
    ///
    /// ## Returns
    /// The non-blocking findings when the request may proceed
    pub fn inspect(&self, inputs: &RequestInputs, origin: &RequestOrigin) -> GuardResult<Vec<Finding>> {
        let findings = inputs.scan(&self.scanner);

        for finding in &findings {
            let blocking = self.config.is_blocking(finding.family);
            SecurityIncident::from_finding(finding, origin, blocking).log();
            if blocking {
                return Err(GuardError::violation(finding.family.violation()));
            }
        }

        Ok(findings)
    }

    /// Log proxy and client headers that carry markup
    ///
    /// ## Returns
    /// Name and logged (truncated) value of each suspicious header
    pub fn inspect_headers(&self, headers: &HeaderMap) -> Vec<(&'static str, String)> {
        let mut suspicious = Vec::new();

        for name in WATCHED_HEADERS {
            let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
                continue;
            };
            if SignatureRegistry::suspicious_header().is_match(value) {
                let value = truncate(value, MAX_VALUE_CHARS);
                tracing::warn!(target: "security", header = name, value = %value, "Suspicious header");
                suspicious.push((name, value));
            }
        }

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if user_agent.len() < 10 {
            tracing::debug!(user_agent, "Request without a plausible User-Agent");
        }

        suspicious
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    pub fn check_uploads(&self, inputs: &RequestInputs) -> GuardResult<()> {
        let policy = UploadPolicy {
            max_file_bytes: self.config.max_file_bytes,
            max_filename_len: self.config.max_filename_len,
            content_scan_bytes: self.config.content_scan_bytes,
            blocked_extensions: &self.config.blocked_extensions,
        };

        for file in inputs.files() {
            validate_upload(file, &policy)?;
        }
        Ok(())
    }

    // ========================================================================
    // Identity and rate limiting
    // ========================================================================

    /// Subject of a valid session token, if the request carries one
    pub fn subject(&self, headers: &HeaderMap) -> Option<String> {
        let codec = self.codec.as_ref()?;
        let token = extract_token(headers, &self.config.session_cookie_name)?;
        codec.decode(&token).ok().map(|claims| claims.sub)
    }

    /// Consume one request from the IP, user and global budgets
    ///
    /// ## Returns
    /// The decision that drives the `X-RateLimit-*` headers
    pub async fn rate_limit(
        &self,
        ip: &str,
        subject: Option<&str>,
        path: &str,
    ) -> GuardResult<RateLimitDecision> {
        let composite = self
            .limiter
            .evaluate(ip, subject, LimitClass::for_path(path))
            .await;

        if composite.allowed() {
            Ok(composite.decision)
        } else {
            Err(GuardError::RateLimitExceeded(composite.decision))
        }
    }

    // ========================================================================
    // CSRF
    // ========================================================================

    pub fn issue_csrf(&self, session_id: &str) -> CsrfToken {
        self.csrf.issue(session_id)
    }

    pub fn validate_csrf(&self, token: Option<&str>, session_id: &str) -> GuardResult<()> {
        let token = token.ok_or(GuardError::CsrfInvalid)?;
        self.csrf.validate(token, session_id)
    }
}

/// CSRF session identity: the authenticated subject, else the client IP
pub fn csrf_session_id(subject: Option<&str>, ip: Option<IpAddr>) -> String {
    match (subject, ip) {
        (Some(subject), _) => format!("user:{subject}"),
        (None, Some(ip)) => format!("ip:{ip}"),
        (None, None) => "anonymous".to_string(),
    }
}

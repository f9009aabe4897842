//! Hardening response headers

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
     script-src 'self'; \
     style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
     font-src 'self' https://fonts.gstatic.com; \
     img-src 'self' data: https:; \
     connect-src 'self'; \
     frame-ancestors 'self'";

pub const PERMISSIONS_POLICY: &str = "geolocation=(), microphone=(), camera=()";

pub const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains";

/// Headers set on every response
pub fn hardening_headers(encrypted: bool) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ),
        (
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static(PERMISSIONS_POLICY),
        ),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
    ];

    if encrypted {
        headers.push((
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        ));
    }

    headers
}

/// Apply the hardening headers, keeping any value a handler already chose
pub fn apply_hardening_headers(target: &mut HeaderMap, encrypted: bool) {
    for (name, value) in hardening_headers(encrypted) {
        target.entry(name).or_insert(value);
    }
}

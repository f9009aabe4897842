//! Session Cookie Infrastructure
//!
//! Builds the `Set-Cookie` value that carries the access token to browsers
//! and reads it back on the way in.
//!
//! Attribute policy:
//! - `Path=/`, `HttpOnly` always
//! - `Secure` when the transport is encrypted
//! - `SameSite=Lax` for same-site deployments
//! - `SameSite=None; Secure; Partitioned` when the frontend embeds the API
//!   cross-site

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Utc};

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// CHIPS partitioned storage; only meaningful with `SameSite=None`
    pub partitioned: bool,
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "auth_token".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            partitioned: false,
            path: "/".to_string(),
        }
    }
}

impl CookieConfig {
    /// Cookie policy for the session token
    ///
    /// ## Arguments
    /// * `name` - Cookie name
    /// * `encrypted` - Whether the request arrived over TLS
    /// * `cross_site` - Whether the frontend lives on another site
    pub fn session(name: impl Into<String>, encrypted: bool, cross_site: bool) -> Self {
        let (same_site, partitioned) = if cross_site {
            (SameSite::None, true)
        } else {
            (SameSite::Lax, false)
        };

        Self {
            name: name.into(),
            // Browsers drop SameSite=None cookies without Secure
            secure: encrypted || cross_site,
            http_only: true,
            same_site,
            partitioned,
            path: "/".to_string(),
        }
    }

    /// Build Set-Cookie header value
    pub fn build_set_cookie(&self, value: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let max_age = (expires_at - now).num_seconds().max(0);

        let mut cookie = format!("{}={}", self.name, value);
        cookie.push_str(&format!("; Max-Age={}", max_age));
        cookie.push_str(&format!(
            "; Expires={}",
            expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
        cookie.push_str(&format!("; Path={}", self.path));

        if self.secure {
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        if self.partitioned && self.same_site == SameSite::None {
            cookie.push_str("; Partitioned");
        }

        cookie
    }

    /// Build Set-Cookie header for deletion (expired)
    pub fn build_delete_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path={}",
            self.name, self.path
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        if self.partitioned && self.same_site == SameSite::None {
            cookie.push_str("; Partitioned");
        }
        cookie
    }
}

/// Whether the request reached us over TLS (directly or via a proxy)
pub fn is_encrypted(headers: &HeaderMap, tls_terminated_here: bool) -> bool {
    tls_terminated_here
        || headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Extract a cookie value from headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;

            if key == name && !value.is_empty() {
                Some(value.to_string())
            } else {
                None
            }
        })
}

/// Create a Set-Cookie header value
pub fn set_cookie_header(
    config: &CookieConfig,
    value: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<HeaderValue> {
    HeaderValue::from_str(&config.build_set_cookie(value, expires_at, now)).ok()
}

/// Create a Set-Cookie header value that clears the cookie
pub fn delete_cookie_header(config: &CookieConfig) -> Option<HeaderValue> {
    HeaderValue::from_str(&config.build_delete_cookie()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_same_site_session_cookie() {
        let config = CookieConfig::session("auth_token", true, false);
        let cookie = config.build_set_cookie("abc", now() + Duration::days(1), now());

        assert!(cookie.starts_with("auth_token=abc"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Expires=Thu, 02 Jan 2025 00:00:00 GMT"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Partitioned"));
    }

    #[test]
    fn test_plain_http_cookie_is_not_secure() {
        let config = CookieConfig::session("auth_token", false, false);
        let cookie = config.build_set_cookie("abc", now() + Duration::hours(1), now());
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_cross_site_cookie_is_partitioned() {
        let config = CookieConfig::session("auth_token", false, true);
        let cookie = config.build_set_cookie("abc", now() + Duration::hours(1), now());

        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Partitioned"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_delete_cookie() {
        let config = CookieConfig::session("auth_token", true, false);
        let cookie = config.build_delete_cookie();
        assert!(cookie.starts_with("auth_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_is_encrypted() {
        let mut headers = HeaderMap::new();
        assert!(!is_encrypted(&headers, false));
        assert!(is_encrypted(&headers, true));

        headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS"));
        assert!(is_encrypted(&headers, false));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; auth_token=abc123; other=xyz"),
        );

        assert_eq!(
            extract_cookie(&headers, "auth_token"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_cookie(&headers, "foo"), Some("bar".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }
}

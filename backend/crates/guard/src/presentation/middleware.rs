//! Guard Middleware
//!
//! Runs the request guard in front of every route. The body is buffered
//! once (bounded by `max_body_bytes`), inspected, and handed on unchanged.
//! Hardening headers are added to every response, rejections included, and
//! `X-RateLimit-*` headers whenever a rate-limit decision was made.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::Form;
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequest, Multipart, Query};
use axum::http::{HeaderMap, Method, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::extract_client_ip;
use platform::cookie::is_encrypted;
use platform::rate_limit::{CounterStore, RateLimitDecision};
use tower::{Layer, ServiceExt, service_fn};

use crate::application::guard::{RequestGuard, csrf_session_id};
use crate::domain::headers::apply_hardening_headers;
use crate::domain::incident::RequestOrigin;
use crate::domain::inputs::{BodyInput, RequestInputs, parse_cookie_pairs};
use crate::domain::upload::UploadedFile;
use crate::error::{GuardError, GuardResult, UploadRejection, ViolationKind, rate_limit_headers};

/// Header carrying the CSRF token on state-changing requests
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Per-request facts resolved by the guard, stored in request extensions
#[derive(Debug, Clone)]
pub struct GuardContext {
    pub client_ip: Option<IpAddr>,
    /// Subject of a valid session token
    pub subject: Option<String>,
    pub rate_limit: RateLimitDecision,
}

impl GuardContext {
    /// Identity CSRF tokens are bound to
    pub fn csrf_session_id(&self) -> String {
        csrf_session_id(self.subject.as_deref(), self.client_ip)
    }

    /// Identifier rate-limit budgets are tracked under
    pub fn client_key(&self) -> String {
        client_key(self.client_ip)
    }
}

fn client_key(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware that guards every request
pub async fn guard_request<S>(guard: RequestGuard<S>, req: Request<Body>, next: Next) -> Response
where
    S: CounterStore + Sync + Send + 'static,
{
    let encrypted = is_encrypted(req.headers(), guard.config().tls);

    let (mut response, decision) = match inspect(&guard, req).await {
        Ok((req, decision)) => (next.run(req).await, Some(decision)),
        Err(e) => {
            let decision = match &e {
                GuardError::RateLimitExceeded(decision) => Some(*decision),
                _ => None,
            };
            (e.into_response(), decision)
        }
    };

    let headers = response.headers_mut();
    apply_hardening_headers(headers, encrypted);
    if let Some(decision) = decision {
        for (name, value) in rate_limit_headers(&decision) {
            headers.insert(name, value);
        }
    }

    response
}

/// Run every check and return the rebuilt request
async fn inspect<S>(
    guard: &RequestGuard<S>,
    req: Request<Body>,
) -> GuardResult<(Request<Body>, RateLimitDecision)>
where
    S: CounterStore + Sync,
{
    let config = guard.config();

    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let client_ip = extract_client_ip(req.headers(), peer_ip);

    guard.check_method(req.method())?;
    guard.check_declared_size(content_length(req.headers()))?;

    let subject = guard.subject(req.headers());

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, config.max_body_bytes)
        .await
        .map_err(|_| GuardError::violation(ViolationKind::RequestTooLarge))?;

    let inputs = RequestInputs {
        query: Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default(),
        cookies: parse_cookie_pairs(
            parts
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        ),
        body: parse_body(&parts.headers, bytes.clone(), config.max_body_bytes).await?,
    };

    guard.check_field_count(&inputs)?;

    let origin = RequestOrigin {
        ip: client_key(client_ip),
        user_agent: parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
        request_uri: parts.uri.to_string(),
    };
    guard.inspect(&inputs, &origin)?;
    guard.inspect_headers(&parts.headers);
    guard.check_uploads(&inputs)?;

    if config.require_csrf && is_state_changing(&parts.method) {
        let token = parts.headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
        guard.validate_csrf(token, &csrf_session_id(subject.as_deref(), client_ip))?;
    }

    let decision = guard
        .rate_limit(&origin.ip, subject.as_deref(), parts.uri.path())
        .await?;

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(GuardContext {
        client_ip,
        subject,
        rate_limit: decision,
    });

    Ok((req, decision))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn is_state_changing(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Parse the buffered body according to its content type
async fn parse_body(headers: &HeaderMap, bytes: Bytes, limit: usize) -> GuardResult<BodyInput> {
    if bytes.is_empty() {
        return Ok(BodyInput::Empty);
    }

    let content_type = content_type(headers);

    if content_type.starts_with("application/json") || content_type.contains("+json") {
        // Malformed JSON is left for the handler to reject
        return Ok(serde_json::from_slice(&bytes)
            .map(BodyInput::Json)
            .unwrap_or(BodyInput::Opaque));
    }

    if !content_type.starts_with("application/x-www-form-urlencoded")
        && !content_type.starts_with("multipart/form-data")
    {
        return Ok(BodyInput::Opaque);
    }

    let mut probe = Request::new(Body::from(bytes));
    *probe.method_mut() = Method::POST;
    *probe.headers_mut() = headers.clone();

    // The body is already bounded; lift the extractor default to the same limit
    let parser = DefaultBodyLimit::max(limit).layer(service_fn(|req: Request<Body>| async move {
        Ok::<_, Infallible>(read_structured(req).await)
    }));

    match parser.oneshot(probe).await {
        Ok(parsed) => parsed,
        Err(never) => match never {},
    }
}

async fn read_structured(req: Request<Body>) -> GuardResult<BodyInput> {
    if content_type(req.headers()).starts_with("multipart/form-data") {
        return read_multipart(req).await;
    }

    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, &())
        .await
        .map_err(|e| GuardError::BadRequest(e.body_text()))?;
    Ok(BodyInput::Form(pairs))
}

async fn read_multipart(req: Request<Body>) -> GuardResult<BodyInput> {
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| GuardError::BadRequest(e.body_text()))?;

    let mut fields = Vec::new();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };

        let name = field.name().unwrap_or("").to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let declared_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                files.push(UploadedFile {
                    field: name,
                    filename,
                    declared_type,
                    data: data.to_vec(),
                });
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                fields.push((name, value));
            }
        }
    }

    Ok(BodyInput::Multipart { fields, files })
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> GuardError {
    if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        GuardError::upload(UploadRejection::TooLarge)
    } else {
        GuardError::BadRequest(e.body_text())
    }
}

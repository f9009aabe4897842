//! Auth Middleware
//!
//! Middleware for requiring authentication on protected routes.
//!
//! The token is read from `Authorization: Bearer ...` first, then from the
//! session cookie. Verified claims are stored in request extensions.

use axum::body::Body;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::token_codec::TokenCodec;
use crate::error::AuthError;

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub codec: Arc<TokenCodec>,
    pub config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self {
            codec: Arc::new(config.token_codec()),
            config,
        }
    }
}

/// Bearer token from the Authorization header, else the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    bearer.or_else(|| platform::cookie::extract_cookie(headers, cookie_name))
}

/// Middleware that requires a valid token
pub async fn require_auth(
    state: AuthMiddlewareState,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = extract_token(req.headers(), &state.config.cookie_name) else {
        return Err(AuthError::MissingToken.into_response());
    };

    let claims = state
        .codec
        .decode(&token)
        .map_err(|e| AuthError::from(e).into_response())?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Middleware that checks the token but doesn't require it
/// Sets `AuthStatus` for downstream handlers
pub async fn check_auth(state: AuthMiddlewareState, mut req: Request<Body>, next: Next) -> Response {
    let claims = extract_token(req.headers(), &state.config.cookie_name)
        .and_then(|token| state.codec.decode(&token).ok());

    req.extensions_mut().insert(AuthStatus {
        is_authenticated: claims.is_some(),
    });
    if let Some(claims) = claims {
        req.extensions_mut().insert(claims);
    }

    next.run(req).await
}

/// Authentication status stored in request extensions
#[derive(Clone, Copy)]
pub struct AuthStatus {
    pub is_authenticated: bool,
}

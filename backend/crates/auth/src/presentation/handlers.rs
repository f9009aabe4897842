//! HTTP Handlers

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use platform::cookie::{delete_cookie_header, is_encrypted, set_cookie_header};

use crate::application::config::AuthConfig;
use crate::application::{
    CheckTokenUseCase, RefreshTokenUseCase, SignInInput, SignInUseCase, SignUpInput, SignUpUseCase,
};
use crate::domain::claims::Claims;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    MeResponse, RefreshRequest, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse,
    TokenResponse, UserResponse, ValidateResponse,
};
use crate::presentation::middleware::extract_token;

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<R>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
}

// ============================================================================
// Sign In
// ============================================================================

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<SignInRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(state.repo.clone(), state.config.clone());

    let output = use_case
        .execute(SignInInput {
            email: req.email,
            password: req.password,
            remember_me: req.remember_me,
        })
        .await?;

    let cookie = session_cookie(&state.config, &headers, &output.token, &output.claims);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SignInResponse {
            user: UserResponse::from(&output.user),
            token: TokenResponse::new(output.token, &output.claims),
        }),
    ))
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/auth/register
pub async fn register<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.config.clone());

    let output = use_case
        .execute(SignUpInput {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            island: req.island,
            city: req.city,
        })
        .await?;

    let user = UserResponse::from(&output.user);

    let Some((token, claims)) = output.session else {
        return Ok((
            StatusCode::CREATED,
            Json(SignUpResponse {
                user,
                requires_email_confirmation: true,
                token: None,
            }),
        )
            .into_response());
    };

    let cookie = session_cookie(&state.config, &headers, &token, &claims);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SignUpResponse {
            user,
            requires_email_confirmation: false,
            token: Some(TokenResponse::new(token, &claims)),
        }),
    )
        .into_response())
}

// ============================================================================
// Refresh
// ============================================================================

/// POST /api/auth/refresh
pub async fn refresh<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let token = extract_token(&headers, &state.config.cookie_name).ok_or(AuthError::MissingToken)?;
    let extend = body.map(|Json(req)| req.extend_expiration).unwrap_or(false);

    let use_case = RefreshTokenUseCase::new(state.repo.clone(), state.config.clone());
    let output = use_case.execute(&token, extend).await?;

    let cookie = session_cookie(&state.config, &headers, &output.token, &output.claims);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse::new(output.token, &output.claims)),
    ))
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/auth/logout
///
/// Tokens are stateless; signing out only clears the cookie.
pub async fn logout<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> impl IntoResponse
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let cookie_config = state.config.cookie(is_encrypted(&headers, state.config.tls));
    let cookie = delete_cookie_header(&cookie_config).unwrap_or_else(|| HeaderValue::from_static(""));

    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)])
}

// ============================================================================
// Validate / Me
// ============================================================================

/// GET /api/auth/validate
pub async fn validate<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> AuthResult<Json<ValidateResponse>>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let token = extract_token(&headers, &state.config.cookie_name).ok_or(AuthError::MissingToken)?;

    let use_case = CheckTokenUseCase::new(state.repo.clone(), state.config.clone());
    let claims = use_case.claims(&token)?;

    Ok(Json(ValidateResponse::from(&claims)))
}

/// GET /api/auth/me (behind `require_auth`)
pub async fn me<R>(
    State(state): State<AuthAppState<R>>,
    Extension(claims): Extension<Claims>,
) -> AuthResult<Json<MeResponse>>
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let user = state
        .repo
        .find_by_id(&UserId::from_db(claims.sub.as_str()))
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(MeResponse {
        user: UserResponse::from(&user),
        expires_at: claims.exp,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn session_cookie(config: &AuthConfig, headers: &HeaderMap, token: &str, claims: &Claims) -> HeaderValue {
    let cookie_config = config.cookie(is_encrypted(headers, config.tls));
    let now = Utc::now();
    let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);

    set_cookie_header(&cookie_config, token, expires_at, now).unwrap_or_else(|| {
        tracing::warn!("Token could not be encoded as a cookie value");
        HeaderValue::from_static("")
    })
}

//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, State};
use platform::rate_limit::CounterStore;

use crate::application::guard::RequestGuard;
use crate::presentation::dto::{CsrfTokenResponse, RateLimitStatusResponse};
use crate::presentation::middleware::{CSRF_HEADER, GuardContext};

/// Shared state for guard handlers
pub struct GuardAppState<S> {
    pub guard: RequestGuard<S>,
}

impl<S> Clone for GuardAppState<S> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
        }
    }
}

/// GET /api/security/csrf-token
///
/// Token is bound to the authenticated user, else to the client IP.
pub async fn csrf_token<S>(
    State(state): State<GuardAppState<S>>,
    Extension(context): Extension<GuardContext>,
) -> Json<CsrfTokenResponse>
where
    S: CounterStore + Sync + Send + 'static,
{
    let issued = state.guard.issue_csrf(&context.csrf_session_id());

    Json(CsrfTokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        header_name: CSRF_HEADER,
    })
}

/// GET /api/security/rate-limit
///
/// Remaining budget of the calling client in every class.
pub async fn rate_limit_status<S>(
    State(state): State<GuardAppState<S>>,
    Extension(context): Extension<GuardContext>,
) -> Json<RateLimitStatusResponse>
where
    S: CounterStore + Sync + Send + 'static,
{
    let identifier = context.client_key();
    let stats = state.guard.limiter().get_stats(&identifier).await;

    Json(RateLimitStatusResponse {
        identifier,
        limits: stats.into_iter().map(Into::into).collect(),
    })
}

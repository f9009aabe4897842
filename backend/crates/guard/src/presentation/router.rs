//! Guard Router

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    routing::get,
};
use platform::rate_limit::CounterStore;

use crate::application::guard::RequestGuard;
use crate::presentation::handlers::{self, GuardAppState};
use crate::presentation::middleware::guard_request;

/// Create the security router
///
/// Mount under `/api/security`. Handlers read the [`GuardContext`] the
/// guard layer inserts, so the application must run behind [`guard_layer`].
///
/// [`GuardContext`]: crate::presentation::middleware::GuardContext
pub fn security_router<S>(guard: RequestGuard<S>) -> Router
where
    S: CounterStore + Sync + Send + 'static,
{
    Router::new()
        .route("/csrf-token", get(handlers::csrf_token::<S>))
        .route("/rate-limit", get(handlers::rate_limit_status::<S>))
        .with_state(GuardAppState { guard })
}

/// Wrap `router` in the request guard
pub fn guard_layer<S>(router: Router, guard: RequestGuard<S>) -> Router
where
    S: CounterStore + Sync + Send + 'static,
{
    router.layer(middleware::from_fn(move |req: Request<Body>, next: Next| {
        guard_request(guard.clone(), req, next)
    }))
}

//! Auth Router

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::repository::UserRepository;
use crate::infra::memory::InMemoryUserRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{AuthMiddlewareState, require_auth};

/// Create the Auth router backed by the in-memory repository
pub fn auth_router(repo: InMemoryUserRepository, config: AuthConfig) -> Router {
    auth_router_generic(repo, config)
}

/// Create a generic Auth router for any repository implementation
///
/// Mount under `/api/auth`.
pub fn auth_router_generic<R>(repo: R, config: AuthConfig) -> Router
where
    R: UserRepository + Clone + Send + Sync + 'static,
{
    let config = Arc::new(config);
    let state = AuthAppState {
        repo: Arc::new(repo),
        config: config.clone(),
    };
    let auth_state = AuthMiddlewareState::new(config);

    let protected = Router::new()
        .route("/me", get(handlers::me::<R>))
        .route_layer(middleware::from_fn(move |req: Request<Body>, next: Next| {
            require_auth(auth_state.clone(), req, next)
        }));

    Router::new()
        .route("/login", post(handlers::login::<R>))
        .route("/register", post(handlers::register::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .route("/validate", get(handlers::validate::<R>))
        .merge(protected)
        .with_state(state)
}

//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::{InMemoryUserRepository, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use guard::presentation::CSRF_HEADER;
use guard::{RequestGuard, guard_layer, security_router};
use platform::rate_limit::{FileCounterStore, RateLimiter, RedisCounterStore, TieredCounterStore};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

type Store = TieredCounterStore<RedisCounterStore, FileCounterStore>;

/// How often dead file-store records are reclaimed
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,auth=info,guard=info,platform=info,security=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    if settings.development {
        tracing::warn!("Development mode: secrets are random and reset on restart");
    }

    // Rate limit counters: Redis when configured, local files as fallback
    let redis = match settings.redis_url.as_deref() {
        Some(url) => match RedisCounterStore::new(url) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, using file counters only");
                None
            }
        },
        None => None,
    };
    let files = FileCounterStore::new(&settings.rate_limit_dir)?;
    tracing::info!(
        redis = redis.is_some(),
        dir = %settings.rate_limit_dir.display(),
        "Rate limit store ready"
    );

    let purge_after = settings.rate_limit.longest_window();
    let limiter: Arc<RateLimiter<Store>> = Arc::new(RateLimiter::new(
        TieredCounterStore::new(redis, files),
        settings.rate_limit,
    ));
    spawn_purge(limiter.clone(), purge_after);

    let guard = RequestGuard::new(limiter, settings.guard)
        .with_token_codec(Arc::new(settings.auth.token_codec()));

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = settings
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            http::HeaderName::from_static(CSRF_HEADER),
        ]))
        .allow_credentials(true);

    // Build router
    let routes = Router::new()
        .nest(
            "/api/auth",
            auth_router(InMemoryUserRepository::new(), settings.auth),
        )
        .nest("/api/security", security_router(guard.clone()));

    let app = guard_layer(routes, guard)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", settings.bind_addr);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically delete file counters older than the longest window
fn spawn_purge(limiter: Arc<RateLimiter<Store>>, max_age: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let now_ms = chrono::Utc::now().timestamp_millis();
            match limiter
                .store()
                .local()
                .purge_stale(now_ms, max_age.as_millis() as i64)
                .await
            {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Purged stale rate limit records"),
                Err(e) => tracing::warn!(error = %e, "Rate limit purge failed"),
            }
        }
    });
}

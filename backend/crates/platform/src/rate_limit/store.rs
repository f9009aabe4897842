//! Counter store seam

use thiserror::Error;

use super::config::RateLimitConfig;
use super::window::WindowSnapshot;

/// Counter store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("Counter store timed out")]
    Timeout,

    #[error("Counter store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Counter record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent sliding-window counters keyed by `rate_limit:{class}:{identifier}`
///
/// Implementations must make [`hit`](LocalCounterStore::hit) atomic per key:
/// two concurrent hits on one key never both observe the same survivor count.
#[trait_variant::make(CounterStore: Send)]
pub trait LocalCounterStore {
    /// Prune, check and (if admitted) record a request at `now_ms`
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot>;

    /// Evaluate the window at `now_ms` without recording anything
    async fn peek(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

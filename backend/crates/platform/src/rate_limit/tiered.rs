//! Fast store with automatic local fallback
//!
//! Each call tries the fast (shared) store first. If it errors, the same call
//! is answered by the local store and a warning is logged; callers never see
//! the failure. Counters are not reconciled between tiers, so during an
//! outage the effective budget is per node.

use tracing::warn;

use super::config::RateLimitConfig;
use super::store::{CounterStore, StoreResult};
use super::window::WindowSnapshot;

#[derive(Debug)]
pub struct TieredCounterStore<F, L> {
    fast: Option<F>,
    local: L,
}

impl<F, L> TieredCounterStore<F, L> {
    pub fn new(fast: Option<F>, local: L) -> Self {
        Self { fast, local }
    }

    pub fn local_only(local: L) -> Self {
        Self { fast: None, local }
    }

    pub fn local(&self) -> &L {
        &self.local
    }
}

impl<F, L> CounterStore for TieredCounterStore<F, L>
where
    F: CounterStore + Sync,
    L: CounterStore + Sync,
{
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        if let Some(fast) = &self.fast {
            match fast.hit(key, now_ms, config).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => warn!(
                    backend = fast.backend(),
                    fallback = self.local.backend(),
                    error = %e,
                    "Rate limit store failed, using fallback"
                ),
            }
        }
        self.local.hit(key, now_ms, config).await
    }

    async fn peek(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        if let Some(fast) = &self.fast {
            match fast.peek(key, now_ms, config).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => warn!(
                    backend = fast.backend(),
                    fallback = self.local.backend(),
                    error = %e,
                    "Rate limit store failed, using fallback"
                ),
            }
        }
        self.local.peek(key, now_ms, config).await
    }

    fn backend(&self) -> &'static str {
        match self.fast {
            Some(_) => "tiered",
            None => self.local.backend(),
        }
    }
}

//! In-process counter store
//!
//! Single-node only; counters vanish on restart. Used in development, tests
//! and as the innermost fallback when no file directory is configured.

use std::sync::Arc;

use dashmap::DashMap;

use super::config::RateLimitConfig;
use super::store::{CounterStore, StoreResult};
use super::window::{self, WindowSnapshot};

#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    records: Arc<DashMap<String, Vec<i64>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop keys whose newest entry is older than `max_age_ms`
    pub fn purge_stale(&self, now_ms: i64, max_age_ms: i64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, timestamps| {
            timestamps
                .iter()
                .max()
                .is_some_and(|&newest| newest > now_ms - max_age_ms)
        });
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CounterStore for MemoryCounterStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        // The entry guard holds the shard lock for the whole read-modify-write
        let mut entry = self.records.entry(key.to_string()).or_default();
        Ok(window::hit(entry.value_mut(), now_ms, config))
    }

    async fn peek(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        let snapshot = match self.records.get(key) {
            Some(timestamps) => window::peek(timestamps.value(), now_ms, config),
            None => window::peek(&[], now_ms, config),
        };
        Ok(snapshot)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryCounterStore::new();
        let config = RateLimitConfig::new(1, 60);

        assert!(store.hit("a", 1_000, &config).await.unwrap().allowed);
        assert!(!store.hit("a", 2_000, &config).await.unwrap().allowed);
        assert!(store.hit("b", 2_000, &config).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_concurrent_hits_never_exceed_budget() {
        let store = MemoryCounterStore::new();
        let config = RateLimitConfig::new(10, 60);

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.hit("shared", 5_000, &config).await.unwrap().allowed
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let store = MemoryCounterStore::new();
        let config = RateLimitConfig::new(5, 60);
        store.hit("old", 0, &config).await.unwrap();
        store.hit("new", 100_000, &config).await.unwrap();

        assert_eq!(store.purge_stale(100_000, 60_000), 1);
        assert_eq!(store.len(), 1);
    }
}

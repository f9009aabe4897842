//! Rate limiter
//!
//! Turns store snapshots into decisions carrying everything the HTTP layer
//! needs (`X-RateLimit-*`, `Retry-After`), and combines the per-IP, per-user
//! and global checks of one request.
//!
//! A store that fails even after its own fallback admits the request: the
//! limiter protects capacity, it is not an authorization control.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};

use super::config::{LimitClass, RateLimitConfig, RateLimitPolicy};
use super::store::CounterStore;
use super::window::WindowSnapshot;

/// Identifier shared by every request for the global budget
pub const GLOBAL_IDENTIFIER: &str = "global";

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub class: LimitClass,
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds at which the budget is (at least partly) available again
    pub reset_at: i64,
    /// Seconds to wait; only set when denied, always `>= 1`
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    fn from_snapshot(
        class: LimitClass,
        config: &RateLimitConfig,
        snapshot: WindowSnapshot,
        now_ms: i64,
    ) -> Self {
        let now_secs = now_ms.div_euclid(1000);

        if snapshot.allowed {
            return Self {
                allowed: true,
                class,
                limit: config.max_requests,
                remaining: config.max_requests.saturating_sub(snapshot.count),
                reset_at: now_secs + config.window.as_secs() as i64,
                retry_after: None,
            };
        }

        let elapsed_ms = now_ms - snapshot.oldest_ms.unwrap_or(now_ms);
        let wait_ms = (config.window_ms() - elapsed_ms).max(0);
        let retry_after = ((wait_ms + 999) / 1000).max(1) as u64;

        Self {
            allowed: false,
            class,
            limit: config.max_requests,
            remaining: 0,
            reset_at: now_secs + retry_after as i64,
            retry_after: Some(retry_after),
        }
    }

    /// Decision used when the store cannot answer
    fn fail_open(class: LimitClass, config: &RateLimitConfig, now_ms: i64) -> Self {
        Self {
            allowed: true,
            class,
            limit: config.max_requests,
            remaining: config.max_requests,
            reset_at: now_ms.div_euclid(1000) + config.window.as_secs() as i64,
            retry_after: None,
        }
    }
}

/// Which identifier a composite decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitScope {
    Ip,
    User,
    Global,
}

impl LimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Ip => "ip",
            LimitScope::User => "user",
            LimitScope::Global => "global",
        }
    }
}

/// Combined result of the per-IP, per-user and global checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeDecision {
    /// The most restrictive denial, or the per-IP decision when all passed
    pub decision: RateLimitDecision,
    pub scope: LimitScope,
}

impl CompositeDecision {
    pub fn allowed(&self) -> bool {
        self.decision.allowed
    }
}

/// Remaining budget of one class, without consuming anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStats {
    pub class: LimitClass,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
    pub window_secs: u64,
}

/// Sliding-window rate limiter over a [`CounterStore`]
#[derive(Debug)]
pub struct RateLimiter<S> {
    store: S,
    policy: RateLimitPolicy,
}

impl<S> RateLimiter<S>
where
    S: CounterStore + Sync,
{
    pub fn new(store: S, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record one request for `identifier` in `class` and decide
    pub async fn check_and_consume(&self, identifier: &str, class: LimitClass) -> RateLimitDecision {
        self.check_and_consume_at(identifier, class, Utc::now().timestamp_millis())
            .await
    }

    /// [`check_and_consume`](Self::check_and_consume) at a given instant (unix ms)
    pub async fn check_and_consume_at(
        &self,
        identifier: &str,
        class: LimitClass,
        now_ms: i64,
    ) -> RateLimitDecision {
        let config = self.policy.get(class);
        let key = class.key(identifier);

        match self.store.hit(&key, now_ms, &config).await {
            Ok(snapshot) => RateLimitDecision::from_snapshot(class, &config, snapshot, now_ms),
            Err(e) => {
                error!(
                    key = %key,
                    backend = self.store.backend(),
                    error = %e,
                    "Rate limit store unavailable, admitting request"
                );
                RateLimitDecision::fail_open(class, &config, now_ms)
            }
        }
    }

    /// Check the client IP, the authenticated user (if any) and the global budget
    ///
    /// Every check records a hit. The denial with the largest `retry_after`
    /// wins, the earliest in IP, user, global order on ties.
    pub async fn evaluate(&self, ip: &str, user: Option<&str>, class: LimitClass) -> CompositeDecision {
        self.evaluate_at(ip, user, class, Utc::now().timestamp_millis())
            .await
    }

    /// [`evaluate`](Self::evaluate) at a given instant (unix ms)
    pub async fn evaluate_at(
        &self,
        ip: &str,
        user: Option<&str>,
        class: LimitClass,
        now_ms: i64,
    ) -> CompositeDecision {
        let ip_decision = self.check_and_consume_at(ip, class, now_ms).await;

        let mut checks = vec![(LimitScope::Ip, ip_decision)];
        if let Some(user) = user {
            let decision = self
                .check_and_consume_at(&format!("user:{user}"), class, now_ms)
                .await;
            checks.push((LimitScope::User, decision));
        }
        let global = self
            .check_and_consume_at(GLOBAL_IDENTIFIER, LimitClass::Global, now_ms)
            .await;
        checks.push((LimitScope::Global, global));

        let mut winner: Option<(LimitScope, RateLimitDecision)> = None;
        for (scope, decision) in checks {
            if decision.allowed {
                continue;
            }
            let wins = match &winner {
                None => true,
                Some((_, best)) => decision.retry_after > best.retry_after,
            };
            if wins {
                winner = Some((scope, decision));
            }
        }

        match winner {
            Some((scope, decision)) => {
                warn!(
                    ip = %ip,
                    user = user.unwrap_or("-"),
                    scope = scope.as_str(),
                    class = class.as_str(),
                    retry_after = decision.retry_after.unwrap_or(0),
                    "Rate limit exceeded"
                );
                CompositeDecision { decision, scope }
            }
            None => CompositeDecision {
                decision: ip_decision,
                scope: LimitScope::Ip,
            },
        }
    }

    /// Remaining budget of `identifier` in every class
    pub async fn get_stats(&self, identifier: &str) -> Vec<RateLimitStats> {
        self.get_stats_at(identifier, Utc::now().timestamp_millis())
            .await
    }

    /// [`get_stats`](Self::get_stats) at a given instant (unix ms)
    pub async fn get_stats_at(&self, identifier: &str, now_ms: i64) -> Vec<RateLimitStats> {
        let mut stats = Vec::with_capacity(LimitClass::ALL.len());

        for class in LimitClass::ALL {
            let config = self.policy.get(class);
            let key = class.key(identifier);

            let (remaining, reset_at) = match self.store.peek(&key, now_ms, &config).await {
                Ok(snapshot) => {
                    let reset_at = snapshot
                        .oldest_ms
                        .map(|oldest| (oldest + config.window_ms()).div_euclid(1000))
                        .unwrap_or(now_ms.div_euclid(1000));
                    (config.max_requests.saturating_sub(snapshot.count), reset_at)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Rate limit stats unavailable");
                    (config.max_requests, now_ms.div_euclid(1000))
                }
            };

            stats.push(RateLimitStats {
                class,
                limit: config.max_requests,
                remaining,
                reset_at,
                window_secs: config.window.as_secs(),
            });
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::memory::MemoryCounterStore;
    use crate::rate_limit::store::{StoreError, StoreResult};

    const T0: i64 = 1_700_000_000_000;
    const SEC: i64 = 1000;

    fn limiter() -> RateLimiter<MemoryCounterStore> {
        RateLimiter::new(MemoryCounterStore::new(), RateLimitPolicy::default())
    }

    #[tokio::test]
    async fn test_auth_class_allows_five_then_denies() {
        let limiter = limiter();

        for i in 0..5 {
            let d = limiter
                .check_and_consume_at("198.51.100.7", LimitClass::Auth, T0 + i * SEC)
                .await;
            assert!(d.allowed, "request {} should pass", i + 1);
            assert_eq!(d.remaining, 4 - i as u32);
            assert_eq!(d.limit, 5);
        }

        let d = limiter
            .check_and_consume_at("198.51.100.7", LimitClass::Auth, T0 + 10 * SEC)
            .await;
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        let retry = d.retry_after.unwrap();
        assert!(retry > 0 && retry <= 60);
        assert_eq!(retry, 50);
        assert_eq!(d.reset_at, (T0 + 10 * SEC) / 1000 + 50);
    }

    #[tokio::test]
    async fn test_budget_returns_after_window() {
        let limiter = limiter();
        for _ in 0..5 {
            limiter
                .check_and_consume_at("ip", LimitClass::Auth, T0)
                .await;
        }
        assert!(
            !limiter
                .check_and_consume_at("ip", LimitClass::Auth, T0 + 59 * SEC)
                .await
                .allowed
        );
        assert!(
            limiter
                .check_and_consume_at("ip", LimitClass::Auth, T0 + 60 * SEC)
                .await
                .allowed
        );
    }

    #[tokio::test]
    async fn test_retry_after_is_at_least_one_second() {
        let limiter = RateLimiter::new(
            MemoryCounterStore::new(),
            RateLimitPolicy::default().with(LimitClass::Api, RateLimitConfig::new(1, 1)),
        );
        limiter.check_and_consume_at("ip", LimitClass::Api, T0).await;
        let d = limiter
            .check_and_consume_at("ip", LimitClass::Api, T0 + 999)
            .await;
        assert_eq!(d.retry_after, Some(1));
    }

    #[tokio::test]
    async fn test_composite_prefers_longest_retry() {
        let policy = RateLimitPolicy::default()
            .with(LimitClass::Api, RateLimitConfig::new(1, 60))
            .with(LimitClass::Global, RateLimitConfig::new(1, 3600));
        let limiter = RateLimiter::new(MemoryCounterStore::new(), policy);

        let first = limiter.evaluate_at("ip", Some("42"), LimitClass::Api, T0).await;
        assert!(first.allowed());
        assert_eq!(first.scope, LimitScope::Ip);

        let second = limiter
            .evaluate_at("ip", Some("42"), LimitClass::Api, T0 + SEC)
            .await;
        assert!(!second.allowed());
        assert_eq!(second.scope, LimitScope::Global);
        assert_eq!(second.decision.retry_after, Some(3599));
    }

    #[tokio::test]
    async fn test_composite_tie_goes_to_first_check() {
        let policy = RateLimitPolicy::default()
            .with(LimitClass::Api, RateLimitConfig::new(1, 60))
            .with(LimitClass::Global, RateLimitConfig::new(1000, 60));
        let limiter = RateLimiter::new(MemoryCounterStore::new(), policy);

        limiter.evaluate_at("ip", Some("42"), LimitClass::Api, T0).await;
        let d = limiter
            .evaluate_at("ip", Some("42"), LimitClass::Api, T0 + SEC)
            .await;

        // IP and user both wait 59s; IP was checked first
        assert!(!d.allowed());
        assert_eq!(d.scope, LimitScope::Ip);
    }

    #[tokio::test]
    async fn test_user_limit_follows_user_across_ips() {
        let policy = RateLimitPolicy::default().with(LimitClass::Api, RateLimitConfig::new(2, 60));
        let limiter = RateLimiter::new(MemoryCounterStore::new(), policy);

        assert!(limiter.evaluate_at("a", Some("7"), LimitClass::Api, T0).await.allowed());
        assert!(limiter.evaluate_at("b", Some("7"), LimitClass::Api, T0).await.allowed());
        let d = limiter.evaluate_at("c", Some("7"), LimitClass::Api, T0).await;
        assert!(!d.allowed());
        assert_eq!(d.scope, LimitScope::User);
    }

    #[tokio::test]
    async fn test_stats_do_not_consume() {
        let limiter = limiter();
        limiter.check_and_consume_at("ip", LimitClass::Auth, T0).await;

        let stats = limiter.get_stats_at("ip", T0 + SEC).await;
        let stats2 = limiter.get_stats_at("ip", T0 + SEC).await;
        assert_eq!(stats, stats2);

        let auth = stats.iter().find(|s| s.class == LimitClass::Auth).unwrap();
        assert_eq!(auth.remaining, 4);
        assert_eq!(auth.reset_at, T0 / 1000 + 60);

        let api = stats.iter().find(|s| s.class == LimitClass::Api).unwrap();
        assert_eq!(api.remaining, 100);
    }

    struct BrokenStore;

    impl CounterStore for BrokenStore {
        async fn hit(&self, _: &str, _: i64, _: &RateLimitConfig) -> StoreResult<WindowSnapshot> {
            Err(StoreError::Timeout)
        }

        async fn peek(&self, _: &str, _: i64, _: &RateLimitConfig) -> StoreResult<WindowSnapshot> {
            Err(StoreError::Timeout)
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_store_failure_admits() {
        let limiter = RateLimiter::new(BrokenStore, RateLimitPolicy::default());
        let d = limiter.check_and_consume_at("ip", LimitClass::Auth, T0).await;
        assert!(d.allowed);
        assert_eq!(d.remaining, 5);
    }
}

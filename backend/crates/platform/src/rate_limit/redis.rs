//! Redis counter store
//!
//! One sorted set per key, scored by request time in milliseconds. The whole
//! prune/count/append runs as a single Lua script, so it is atomic on the
//! server. Every round trip is bounded by a timeout; a slow or absent server
//! surfaces as [`StoreError`] and the tiered store falls back.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use redis::Script;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::config::RateLimitConfig;
use super::store::{CounterStore, StoreError, StoreResult};
use super::window::WindowSnapshot;
use crate::crypto::random_hex;

/// Default bound on one Redis round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// How long to stop dialing after a failed connect
const RECONNECT_COOLDOWN: Duration = Duration::from_secs(5);

const HIT_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local max = tonumber(ARGV[3])
local member = ARGV[4]
local ttl = tonumber(ARGV[5])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window_ms)
local count = redis.call('ZCARD', key)
local allowed = 0
if count < max then
    redis.call('ZADD', key, now, member)
    count = count + 1
    allowed = 1
end
redis.call('EXPIRE', key, ttl)

local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
local oldest_ms = -1
if oldest[2] then
    oldest_ms = tonumber(oldest[2])
end
return {allowed, count, oldest_ms}
"#;

const PEEK_SCRIPT: &str = r#"
local key = KEYS[1]
local cutoff = '(' .. (tonumber(ARGV[1]) - tonumber(ARGV[2]))
local max = tonumber(ARGV[3])

local count = redis.call('ZCOUNT', key, cutoff, '+inf')
local oldest = redis.call('ZRANGEBYSCORE', key, cutoff, '+inf', 'WITHSCORES', 'LIMIT', 0, 1)
local oldest_ms = -1
if oldest[2] then
    oldest_ms = tonumber(oldest[2])
end
local allowed = 0
if count < max then
    allowed = 1
end
return {allowed, count, oldest_ms}
"#;

pub struct RedisCounterStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    last_failure: Mutex<Option<Instant>>,
    timeout: Duration,
    hit_script: Script,
    peek_script: Script,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("timeout", &self.timeout)
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Create a store for `url`; the connection is opened on first use
    ///
    /// ## Errors
    /// Returns [`StoreError::Unavailable`] if the URL cannot be parsed.
    pub fn new(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid redis url: {e}")))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            last_failure: Mutex::new(None),
            timeout: DEFAULT_TIMEOUT,
            hit_script: Script::new(HIT_SCRIPT),
            peek_script: Script::new(PEEK_SCRIPT),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        if let Some(conn) = self.connection.get() {
            return Ok(conn.clone());
        }

        if let Ok(guard) = self.last_failure.lock() {
            if guard.is_some_and(|at| at.elapsed() < RECONNECT_COOLDOWN) {
                return Err(StoreError::Unavailable("redis reconnect cooling down".into()));
            }
        }

        let result = self
            .connection
            .get_or_try_init(|| async {
                let manager = tokio::time::timeout(
                    self.timeout * 4,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| StoreError::Timeout)?
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

                info!("Connected rate limit store to Redis");
                Ok::<_, StoreError>(manager)
            })
            .await;

        match result {
            Ok(conn) => Ok(conn.clone()),
            Err(e) => {
                if let Ok(mut guard) = self.last_failure.lock() {
                    *guard = Some(Instant::now());
                }
                warn!(error = %e, "Redis connection failed");
                Err(e)
            }
        }
    }

    async fn run(&self, script: &Script, key: &str, args: ScriptArgs) -> StoreResult<WindowSnapshot> {
        let mut conn = self.connection().await?;

        let mut invocation = script.key(key);
        invocation
            .arg(args.now_ms)
            .arg(args.window_ms)
            .arg(args.max_requests);
        if let Some(member) = &args.member {
            invocation.arg(member).arg(args.ttl_secs);
        }

        let reply: Vec<i64> = tokio::time::timeout(self.timeout, invocation.invoke_async(&mut conn))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        parse_reply(&reply)
    }
}

struct ScriptArgs {
    now_ms: i64,
    window_ms: i64,
    max_requests: u32,
    member: Option<String>,
    ttl_secs: u64,
}

impl ScriptArgs {
    fn new(now_ms: i64, config: &RateLimitConfig, member: Option<String>) -> Self {
        Self {
            now_ms,
            window_ms: config.window_ms(),
            max_requests: config.max_requests,
            member,
            ttl_secs: config.window.as_secs().max(1),
        }
    }
}

fn parse_reply(reply: &[i64]) -> StoreResult<WindowSnapshot> {
    match reply {
        [allowed, count, oldest] => Ok(WindowSnapshot {
            allowed: *allowed == 1,
            count: (*count).max(0) as u32,
            oldest_ms: (*oldest >= 0).then_some(*oldest),
        }),
        other => Err(StoreError::Unavailable(format!(
            "unexpected script reply of {} values",
            other.len()
        ))),
    }
}

impl CounterStore for RedisCounterStore {
    async fn hit(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        // Unique member so two hits in the same millisecond both count
        let member = format!("{}-{}", now_ms, random_hex(8));
        self.run(&self.hit_script, key, ScriptArgs::new(now_ms, config, Some(member)))
            .await
    }

    async fn peek(
        &self,
        key: &str,
        now_ms: i64,
        config: &RateLimitConfig,
    ) -> StoreResult<WindowSnapshot> {
        self.run(&self.peek_script, key, ScriptArgs::new(now_ms, config, None))
            .await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

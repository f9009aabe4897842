//! Sliding window algorithm
//!
//! Every store applies exactly these steps, under its own atomicity:
//! 1. drop timestamps `<= now - window`
//! 2. if the survivors are fewer than `max_requests`, append `now` and admit
//! 3. otherwise deny without recording
//!
//! Timestamps are unix milliseconds.

use super::config::RateLimitConfig;

/// State of one key right after a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Whether the request was (or would be) admitted
    pub allowed: bool,
    /// Requests in the window, including the admitted one
    pub count: u32,
    /// Oldest surviving timestamp
    pub oldest_ms: Option<i64>,
}

/// Remove timestamps that fell out of the window
pub fn prune(timestamps: &mut Vec<i64>, now_ms: i64, config: &RateLimitConfig) {
    let cutoff = now_ms - config.window_ms();
    timestamps.retain(|&ts| ts > cutoff);
}

/// Prune, check and record one request
pub fn hit(timestamps: &mut Vec<i64>, now_ms: i64, config: &RateLimitConfig) -> WindowSnapshot {
    prune(timestamps, now_ms, config);

    let allowed = (timestamps.len() as u64) < config.max_requests as u64;
    if allowed {
        timestamps.push(now_ms);
    }

    WindowSnapshot {
        allowed,
        count: timestamps.len() as u32,
        oldest_ms: timestamps.iter().copied().min(),
    }
}

/// Evaluate without recording
pub fn peek(timestamps: &[i64], now_ms: i64, config: &RateLimitConfig) -> WindowSnapshot {
    let cutoff = now_ms - config.window_ms();
    let live = timestamps.iter().copied().filter(|&ts| ts > cutoff);

    let (count, oldest_ms) = live.fold((0u32, None::<i64>), |(n, oldest), ts| {
        (n + 1, Some(oldest.map_or(ts, |o| o.min(ts))))
    });

    WindowSnapshot {
        allowed: (count as u64) < config.max_requests as u64,
        count,
        oldest_ms,
    }
}

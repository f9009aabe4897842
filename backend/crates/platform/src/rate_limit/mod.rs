//! Rate Limiting Infrastructure
//!
//! Sliding-window request limiting over pluggable counter stores.
//!
//! ## Layout
//! - [`config`]: limit classes and their `{max_requests, window}` budgets
//! - [`window`]: the pure sliding-window algorithm every store applies
//! - [`store`]: the `CounterStore` seam
//! - [`memory`], [`file`], [`redis`]: store backends
//! - [`tiered`]: fast store with automatic fallback to a local one
//! - [`limiter`]: per-identifier and composite (IP / user / global) checks

pub mod config;
pub mod file;
pub mod limiter;
pub mod memory;
pub mod redis;
pub mod store;
pub mod tiered;
pub mod window;

pub use config::{LimitClass, RateLimitConfig, RateLimitPolicy};
pub use file::FileCounterStore;
pub use limiter::{
    CompositeDecision, GLOBAL_IDENTIFIER, LimitScope, RateLimitDecision, RateLimitStats, RateLimiter,
};
pub use memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;
pub use store::{CounterStore, LocalCounterStore, StoreError, StoreResult};
pub use tiered::TieredCounterStore;
pub use window::WindowSnapshot;

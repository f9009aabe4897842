//! Limit classes and budgets

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// Named bucket of requests sharing one budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    /// Sign-in, registration and other credential endpoints
    Auth,
    /// Regular API traffic
    Api,
    /// Coarse hourly ceiling shared by all traffic
    Global,
}

impl LimitClass {
    pub const ALL: [LimitClass; 3] = [LimitClass::Auth, LimitClass::Api, LimitClass::Global];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitClass::Auth => "auth",
            LimitClass::Api => "api",
            LimitClass::Global => "global",
        }
    }

    /// Class for a request path: credential endpoints get the strict budget
    pub fn for_path(path: &str) -> Self {
        if path.contains("auth") {
            LimitClass::Auth
        } else {
            LimitClass::Api
        }
    }

    /// Storage key for `identifier` in this class
    pub fn key(&self, identifier: &str) -> String {
        format!("rate_limit:{}:{}", self.as_str(), identifier)
    }
}

impl fmt::Display for LimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LimitClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for LimitClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auth" => Ok(LimitClass::Auth),
            "api" => Ok(LimitClass::Api),
            "global" => Ok(LimitClass::Global),
            other => Err(format!("unknown limit class: {other}")),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Budgets for every limit class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub auth: RateLimitConfig,
    pub api: RateLimitConfig,
    pub global: RateLimitConfig,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            auth: RateLimitConfig::new(5, 60),
            api: RateLimitConfig::new(100, 60),
            global: RateLimitConfig::new(1000, 3600),
        }
    }
}

impl RateLimitPolicy {
    /// Relaxed budgets for local development
    pub fn development() -> Self {
        Self {
            auth: RateLimitConfig::new(50, 60),
            ..Self::default()
        }
    }

    pub fn get(&self, class: LimitClass) -> RateLimitConfig {
        match class {
            LimitClass::Auth => self.auth,
            LimitClass::Api => self.api,
            LimitClass::Global => self.global,
        }
    }

    pub fn with(mut self, class: LimitClass, config: RateLimitConfig) -> Self {
        match class {
            LimitClass::Auth => self.auth = config,
            LimitClass::Api => self.api = config,
            LimitClass::Global => self.global = config,
        }
        self
    }

    /// Longest window across classes; records older than this are dead
    pub fn longest_window(&self) -> Duration {
        LimitClass::ALL
            .iter()
            .map(|class| self.get(*class).window)
            .max()
            .unwrap_or_default()
    }
}

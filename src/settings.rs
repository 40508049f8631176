//! Client configuration loaded from a settings document.
//!
//! Field names are snake_case; durations are integer milliseconds.
//!
//! ```json
//! {
//!   "base_url": "https://api.example.com/v1",
//!   "timeout_ms": 10000,
//!   "headers": { "x-client": "dashboard" },
//!   "notify_on_failure": true,
//!   "retry": { "max_retries": 2, "base_delay_ms": 500 },
//!   "rate_limit": { "enabled": false }
//! }
//! ```

use crate::rate_limit::RateLimitConfig;
use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Top-level client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL every call path is joined onto.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds. No timeout when absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Extra default headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Whether terminal failures notify the user by default.
    #[serde(default)]
    pub notify_on_failure: bool,
    /// Default retry policy.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Rate limit handling.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// Retry policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY.as_millis() as u64
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Converts into a policy with the default classifier.
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Rate limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Whether server hints replace the computed backoff.
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Longest accepted server-requested wait, in milliseconds.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_max_wait_ms() -> u64 {
    300_000
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl RateLimitSettings {
    /// Converts into the runtime configuration.
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            enabled: self.enabled,
            max_wait: Duration::from_millis(self.max_wait_ms),
        }
    }
}

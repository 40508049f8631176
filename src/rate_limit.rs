//! Server-provided rate limit hints.
//!
//! Throttled responses often say how long to wait. When rate limit handling
//! is enabled the executor waits that long (capped) instead of the computed
//! backoff.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate limit hints parsed from response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// When the limit window resets (`X-RateLimit-Reset` / `RateLimit-Reset`).
    pub reset_at: Option<SystemTime>,
    /// How long to wait before retrying (`Retry-After`).
    pub retry_after: Option<Duration>,
    /// Requests remaining in the current window (`X-RateLimit-Remaining`).
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Parses rate limit headers.
    ///
    /// `Retry-After` may be delay-seconds or an HTTP date; reset headers are
    /// unix timestamps in seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use steadycall::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    /// use std::time::Duration;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "7".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert_eq!(info.retry_after, Some(Duration::from_secs(7)));
    /// assert!(info.is_active());
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: header_str(headers, "x-ratelimit-reset")
                .or_else(|| header_str(headers, "ratelimit-reset"))
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| UNIX_EPOCH + Duration::from_secs(secs)),
            retry_after: header_str(headers, "retry-after").and_then(parse_retry_after),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// Returns `true` if the headers describe a limit currently in force.
    pub fn is_active(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }

    /// The wait the server asked for, capped at `max_wait`.
    ///
    /// `Retry-After` wins over the reset timestamp. Returns `None` when
    /// neither is usable.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        if let Some(retry_after) = self.retry_after {
            return Some(retry_after.min(max_wait));
        }

        let until_reset = self.reset_at?.duration_since(SystemTime::now()).ok()?;
        Some(until_reset.min(max_wait))
    }
}

/// Client-wide rate limit handling.
///
/// # Examples
///
/// ```
/// use steadycall::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::new(Duration::from_secs(60));
/// assert!(config.enabled);
/// assert!(!RateLimitConfig::disabled().enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether server hints replace the computed backoff.
    pub enabled: bool,
    /// Longest wait accepted from a server hint.
    pub max_wait: Duration,
}

impl RateLimitConfig {
    /// Enabled handling with a custom cap.
    pub fn new(max_wait: Duration) -> Self {
        Self {
            enabled: true,
            max_wait,
        }
    }

    /// Ignore server hints and always use the computed backoff.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim)
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = httpdate::parse_http_date(value).ok()?;
    // A date already in the past means "retry now".
    Some(at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
}

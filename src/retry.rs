//! Retry policies and failure classification.
//!
//! A [`RetryPolicy`] bounds how many times a call is retried and how long it
//! waits in between. Its [`RetryClassifier`] decides which failures are worth
//! another attempt.

use crate::{backoff, Error, Result};
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Default ceiling for any single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// How a call retries transient failures.
///
/// # Examples
///
/// ```
/// use steadycall::{RetryClassifier, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(5, Duration::from_millis(200), Duration::from_secs(10))
///     .with_classifier(RetryClassifier::Never);
///
/// assert_eq!(policy.max_attempts(), 6);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt. `0` means a single attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent one.
    pub base_delay: Duration,
    /// Ceiling for any single delay. Must not be below `base_delay`.
    pub max_delay: Duration,
    /// Decides which failures are retried.
    pub classifier: RetryClassifier,
}

impl RetryPolicy {
    /// Creates a policy using the default classifier.
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            classifier: RetryClassifier::Default,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Replaces the classifier.
    pub fn with_classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Total number of attempts this policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Checks the delay invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] when `base_delay` is zero or
    /// `max_delay` is below `base_delay`.
    pub fn validate(&self) -> Result<()> {
        if self.base_delay.is_zero() {
            return Err(Error::ConfigurationError(
                "retry base delay must be positive".to_string(),
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(Error::ConfigurationError(format!(
                "retry max delay {:?} is below base delay {:?}",
                self.max_delay, self.base_delay
            )));
        }
        Ok(())
    }

    /// Backoff delay following the failed `attempt` (1-indexed), with jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        backoff::delay(attempt, self.base_delay, self.max_delay)
    }

    /// Returns `true` when `error` on `attempt` should be followed by another attempt.
    ///
    /// Both the classifier and the remaining budget must agree.
    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt <= self.max_retries && self.classifier.is_retryable(error, attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// Per-call override of individual [`RetryPolicy`] fields.
///
/// Unset fields fall back to the client's default policy.
///
/// # Examples
///
/// ```
/// use steadycall::{RetryOverride, RetryPolicy};
/// use std::time::Duration;
///
/// let merged = RetryOverride::new()
///     .max_retries(0)
///     .apply(&RetryPolicy::default());
///
/// assert_eq!(merged.max_retries, 0);
/// assert_eq!(merged.base_delay, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryOverride {
    max_retries: Option<u32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    classifier: Option<RetryClassifier>,
}

impl RetryOverride {
    /// Creates an override that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the retry budget.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Overrides the base delay.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Overrides the delay ceiling.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Replaces the classifier for this call.
    pub fn classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Produces the effective policy for one call.
    pub fn apply(&self, defaults: &RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            base_delay: self.base_delay.unwrap_or(defaults.base_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            classifier: self
                .classifier
                .clone()
                .unwrap_or_else(|| defaults.classifier.clone()),
        }
    }
}

impl From<RetryPolicy> for RetryOverride {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_retries: Some(policy.max_retries),
            base_delay: Some(policy.base_delay),
            max_delay: Some(policy.max_delay),
            classifier: Some(policy.classifier),
        }
    }
}

/// Named strategies for deciding whether a failure is retryable.
#[derive(Clone, Default)]
pub enum RetryClassifier {
    /// Retry transport failures, timeouts, 5xx, 408 and 429.
    #[default]
    Default,
    /// Never retry.
    Never,
    /// The default rule plus the listed statuses, e.g. 409 for an
    /// idempotent endpoint.
    Statuses(Vec<StatusCode>),
    /// A caller-supplied predicate that replaces the default rule entirely.
    Custom(Arc<dyn RetryPredicate>),
}

impl RetryClassifier {
    /// Wraps a predicate as a custom classifier.
    pub fn custom<P>(predicate: P) -> Self
    where
        P: RetryPredicate + 'static,
    {
        RetryClassifier::Custom(Arc::new(predicate))
    }

    /// Returns `true` if `error` is worth another attempt.
    ///
    /// Decode failures are never retried: the server answered successfully
    /// and asking again would not change the payload's shape.
    pub fn is_retryable(&self, error: &Error, attempt: u32) -> bool {
        if matches!(error, Error::DeserializationFailed { .. }) {
            return false;
        }
        match self {
            RetryClassifier::Default => error.is_retryable(),
            RetryClassifier::Never => false,
            RetryClassifier::Statuses(extra) => {
                error.is_retryable() || error.status().is_some_and(|s| extra.contains(&s))
            }
            RetryClassifier::Custom(predicate) => predicate.should_retry(error, attempt),
        }
    }
}

impl fmt::Debug for RetryClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryClassifier::Default => f.write_str("Default"),
            RetryClassifier::Never => f.write_str("Never"),
            RetryClassifier::Statuses(statuses) => f.debug_tuple("Statuses").field(statuses).finish(),
            RetryClassifier::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Trait for custom retry decisions.
///
/// # Examples
///
/// ```
/// use steadycall::{Error, RetryPredicate};
///
/// struct RetryOnConflict;
///
/// impl RetryPredicate for RetryOnConflict {
///     fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
///         error.status().is_some_and(|s| s.as_u16() == 409)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether the call should be retried after `error`.
    ///
    /// `attempt` is the 1-indexed number of the attempt that just failed.
    fn should_retry(&self, error: &Error, attempt: u32) -> bool;
}

/// Retry everything [`Error::is_retryable`] accepts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        error.is_retryable()
    }
}

/// Retry only on 5xx server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        matches!(error, Error::HttpError { status, .. } if status.is_server_error())
    }
}

/// Retry only on client-side timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        matches!(error, Error::Timeout { .. })
    }
}

/// Retry only on transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        matches!(error, Error::Transport { .. })
    }
}

/// Retry only on the listed statuses.
#[derive(Debug, Clone)]
pub struct RetryOnStatus(pub Vec<StatusCode>);

impl RetryPredicate for RetryOnStatus {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        error.status().is_some_and(|s| self.0.contains(&s))
    }
}

/// Combine predicates with OR logic.
///
/// # Examples
///
/// ```
/// use steadycall::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};
///
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryOn5xx),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a new `OrPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}

/// Combine predicates with AND logic.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a new `AndPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        self.predicates
            .iter()
            .all(|p| p.should_retry(error, attempt))
    }
}

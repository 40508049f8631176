//! Exponential backoff with bounded jitter.
//!
//! The delay before the retry that follows attempt `n` is
//! `base * 2^(n-1)` plus up to 10% of that value as jitter, capped at the
//! policy's maximum delay.

use rand::Rng;
use std::time::Duration;

/// Upper bound of the jitter, as a fraction of the exponential delay.
pub const MAX_JITTER_FRACTION: f64 = 0.1;

/// Computes the delay that follows a failed `attempt` (1-indexed).
///
/// `jitter_fraction` is clamped into `[0, MAX_JITTER_FRACTION]`. The result is
/// always within `[base, max]` as long as `base <= max`.
///
/// # Examples
///
/// ```
/// use steadycall::backoff::delay_with_jitter;
/// use std::time::Duration;
///
/// let base = Duration::from_millis(100);
/// let max = Duration::from_secs(1);
///
/// assert_eq!(delay_with_jitter(1, base, max, 0.0), Duration::from_millis(100));
/// assert_eq!(delay_with_jitter(3, base, max, 0.0), Duration::from_millis(400));
/// assert_eq!(delay_with_jitter(3, base, max, 0.1), Duration::from_millis(440));
/// assert_eq!(delay_with_jitter(10, base, max, 0.1), max);
/// ```
pub fn delay_with_jitter(attempt: u32, base: Duration, max: Duration, jitter_fraction: f64) -> Duration {
    let exponent = attempt.max(1) - 1;
    let multiplier = 2u32.saturating_pow(exponent);
    let exponential = base.checked_mul(multiplier).unwrap_or(Duration::MAX);

    if exponential >= max {
        return max;
    }

    let jitter_fraction = if jitter_fraction.is_finite() {
        jitter_fraction.clamp(0.0, MAX_JITTER_FRACTION)
    } else {
        0.0
    };

    let with_jitter = Duration::try_from_secs_f64(exponential.as_secs_f64() * (1.0 + jitter_fraction))
        .unwrap_or(max);

    // Float rounding must not drop the result under the exponential value.
    with_jitter.max(exponential).min(max)
}

/// Computes the delay that follows a failed `attempt`, drawing jitter from the
/// thread-local RNG.
pub fn delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let jitter_fraction = rand::thread_rng().gen_range(0.0..=MAX_JITTER_FRACTION);
    delay_with_jitter(attempt, base, max, jitter_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays_without_jitter() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(10);

        assert_eq!(delay_with_jitter(1, base, max, 0.0), Duration::from_millis(100));
        assert_eq!(delay_with_jitter(2, base, max, 0.0), Duration::from_millis(200));
        assert_eq!(delay_with_jitter(3, base, max, 0.0), Duration::from_millis(400));
        assert_eq!(delay_with_jitter(4, base, max, 0.0), Duration::from_millis(800));
        assert_eq!(delay_with_jitter(5, base, max, 0.0), Duration::from_millis(1600));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);

        assert_eq!(delay_with_jitter(6, base, max, 0.0), max);
        assert_eq!(delay_with_jitter(5, base, max, 0.1), Duration::from_millis(17_600));
        assert_eq!(delay_with_jitter(u32::MAX, base, max, 0.1), max);
    }

    #[test]
    fn test_delay_always_within_bounds() {
        let base = Duration::from_millis(250);
        let max = Duration::from_secs(5);

        for attempt in 1..=64 {
            for _ in 0..20 {
                let d = delay(attempt, base, max);
                assert!(d >= base, "attempt {attempt}: {d:?} < {base:?}");
                assert!(d <= max, "attempt {attempt}: {d:?} > {max:?}");
            }
        }
    }

    #[test]
    fn test_jitter_is_bounded() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(60);

        for _ in 0..100 {
            let d = delay(3, base, max);
            assert!(d >= Duration::from_secs(4));
            assert!(d <= Duration::from_millis(4400));
        }

        // Out of range fractions are clamped.
        assert_eq!(delay_with_jitter(1, base, max, 5.0), Duration::from_millis(1100));
        assert_eq!(delay_with_jitter(1, base, max, -1.0), base);
        assert_eq!(delay_with_jitter(1, base, max, f64::NAN), base);
    }

    #[test]
    fn test_attempt_zero_behaves_like_first_attempt() {
        let base = Duration::from_millis(100);
        let max = Duration::from_secs(1);
        assert_eq!(delay_with_jitter(0, base, max, 0.0), base);
    }

    #[test]
    fn test_base_equal_to_max() {
        let base = Duration::from_secs(2);
        assert_eq!(delay_with_jitter(1, base, base, 0.1), base);
        assert_eq!(delay_with_jitter(4, base, base, 0.0), base);
    }
}

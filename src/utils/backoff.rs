use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Retry strategy for remote API calls. Lives at the adapter boundary:
/// the sync engines only ever see the definitive outcome after the final
/// attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Only rate limits and server errors are worth retrying; everything
    /// else is a definitive answer.
    pub fn is_retryable(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }

    /// Delay before the next attempt. `attempt` counts from 0. A
    /// server-supplied `Retry-After` hint wins over the computed backoff,
    /// capped at `max_delay` either way.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }

        let exponential = self
            .base_delay
            .saturating_mul(1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX));
        let capped = exponential.min(self.max_delay);

        let jitter_window = (capped.as_millis() as u64 / 4).max(1);
        let jitter = Duration::from_millis(rand::rng().random_range(0..jitter_window));
        (capped + jitter).min(self.max_delay)
    }
}

/// Parse a `Retry-After: <seconds>` response header.
pub fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::{retry_after_hint, RetryPolicy};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }

    #[test]
    fn delay_grows_with_attempts() {
        let policy = policy();
        for _ in 0..20 {
            let first = policy.delay_for(0, None);
            let third = policy.delay_for(2, None);
            assert!(first >= Duration::from_millis(100));
            assert!(first < Duration::from_millis(200));
            assert!(third >= Duration::from_millis(400));
            assert!(third < Duration::from_millis(600));
        }
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy = policy();
        for _ in 0..20 {
            assert!(policy.delay_for(30, None) <= policy.max_delay);
        }
    }

    #[test]
    fn retry_after_hint_overrides_backoff() {
        let policy = policy();
        let delay = policy.delay_for(0, Some(Duration::from_secs(7)));
        assert_eq!(delay, Duration::from_secs(7));
    }

    #[test]
    fn retry_after_hint_is_capped() {
        let policy = policy();
        let delay = policy.delay_for(0, Some(Duration::from_secs(600)));
        assert_eq!(delay, policy.max_delay);
    }

    #[test]
    fn retryable_statuses() {
        assert!(RetryPolicy::is_retryable(429));
        assert!(RetryPolicy::is_retryable(500));
        assert!(RetryPolicy::is_retryable(503));
        assert!(!RetryPolicy::is_retryable(404));
        assert!(!RetryPolicy::is_retryable(422));
        assert!(!RetryPolicy::is_retryable(200));
    }

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn ignores_unparseable_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_hint(&headers), None);
        assert_eq!(retry_after_hint(&HeaderMap::new()), None);
    }
}

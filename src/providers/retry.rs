//! Retry policy and the shared retry helper.
//!
//! Every external call site (single embeddings, batched embeddings, tool
//! suggestions) goes through [`with_retry`], keeping retry logic in a
//! single place.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::telemetry;
use crate::{MaitreError, Result};

/// Policy for retrying failed external calls.
///
/// Uses exponential backoff: `initial_delay * multiplier^attempt`, capped
/// at `max_delay`. Whether an error is retried at all is decided by the
/// `retryable` predicate.
///
/// ```rust
/// # use maitre::RetryPolicy;
/// # use std::time::Duration;
/// let policy = RetryPolicy::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Growth factor applied per attempt. Default: 2.0.
    pub multiplier: f64,
    /// Maximum delay between retries. Default: 30s.
    pub max_delay: Duration,
    /// Which errors are worth retrying. Default: [`MaitreError::is_transient`].
    pub retryable: fn(&MaitreError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            retryable: MaitreError::is_transient,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Replace the retryable-error predicate.
    pub fn retry_if(mut self, predicate: fn(&MaitreError) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    /// Delay before retry number `attempt + 1` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Delay honouring a provider `retry_after` hint when present.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Execute an async operation under a retry policy.
///
/// Retries errors accepted by `policy.retryable` up to
/// `policy.max_attempts`, sleeping with exponential backoff between
/// attempts. Any other error is returned immediately.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    provider_name: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..policy.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if (policy.retryable)(&e) => {
                if attempt + 1 < policy.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider_name.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    let delay = policy.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        operation,
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(MaitreError::NoProvider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new().initial_delay(Duration::from_millis(1))
    }

    #[test]
    fn defaults_match_documented_values() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.initial_delay, Duration::from_secs(1));
        assert_eq!(p.multiplier, 2.0);
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let p = RetryPolicy::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(500));
        assert_eq!(p.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(p.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(p.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(p.delay_for_attempt(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn retry_after_hint_wins() {
        let p = RetryPolicy::new();
        assert_eq!(
            p.effective_delay(0, Some(Duration::from_millis(7))),
            Duration::from_millis(7)
        );
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast(), "mock", "embed", || async move {
            let n = calls.fetch_add(1, Ordering::Relaxed);
            if n < 2 {
                Err(MaitreError::Timeout("deadline".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = with_retry(&fast(), "mock", "embed", || async move {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(MaitreError::Timeout("deadline".into()))
        })
        .await;
        assert!(matches!(result, Err(MaitreError::Timeout(_))));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = with_retry(&fast(), "mock", "embed", || async move {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(MaitreError::AuthenticationFailed)
        })
        .await;
        assert!(matches!(result, Err(MaitreError::AuthenticationFailed)));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn custom_predicate_is_honoured() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = fast().retry_if(|e| matches!(e, MaitreError::RateLimited { .. }));
        let result: Result<()> = with_retry(&policy, "mock", "complete", || async move {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(MaitreError::RateLimited { retry_after: None })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}

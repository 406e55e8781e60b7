//! Retry policy for index-service calls.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::{RetrievalError, RetrievalResult};

/// Exponential backoff applied to transient index failures.
///
/// Non-transient errors (bad collection name, malformed response) are
/// returned on the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: usize,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Retry up to `max_retries` times, starting at 50ms between attempts.
    pub const fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }

    /// Make exactly one attempt.
    pub const fn none() -> Self {
        Self::new(0)
    }

    pub const fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Run `op`, retrying while it fails transiently.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> RetrievalResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RetrievalResult<T>>,
    {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter();

        op.retry(backoff)
            .when(RetrievalError::is_transient)
            .notify(|err: &RetrievalError, delay: Duration| {
                log::warn!("{} failed ({}), retrying in {:?}", label, err, delay);
            })
            .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let attempts = AtomicUsize::new(0);
        let result = RetryPolicy::new(3)
            .run("flaky", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RetrievalError::RateLimited)
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let attempts = AtomicUsize::new(0);
        let result: RetrievalResult<()> = RetryPolicy::new(3)
            .run("broken", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(RetrievalError::Parse {
                    message: "not json".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(RetrievalError::Parse { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_makes_a_single_attempt() {
        let attempts = AtomicUsize::new(0);
        let result: RetrievalResult<()> = RetryPolicy::none()
            .run("once", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(RetrievalError::RateLimited)
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

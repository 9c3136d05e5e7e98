//! Retry helper for transient errors
//!
//! Kept separate from the status poll loop: probes never retry on their own,
//! callers wrap the API call in [`retry_when`] when a transient failure
//! (throttling, eventual consistency right after create) should be retried.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

use crate::context::Context;
use crate::error::RetryError;

/// Backoff settings for [`retry_when`]
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sleep after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run `op` until it succeeds, returns an error `is_retryable` rejects, the
/// timeout elapses, or the context is cancelled.
///
/// The operation is always started at least once. Each attempt is raced against
/// cancellation and the deadline, so an attempt that hangs is abandoned
/// rather than holding the caller past its budget.
pub async fn retry_when<T, E, F, Fut, P>(
    ctx: &Context,
    timeout: Duration,
    config: &RetryConfig,
    mut op: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempts = 0u32;
    let mut last: Option<E> = None;

    loop {
        if ctx.is_cancelled() {
            return Err(RetryError::Cancelled { attempts, last });
        }
        if attempts > 0 && Instant::now() >= deadline {
            return Err(timed_out(started, attempts, last));
        }

        attempts += 1;
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(RetryError::Cancelled { attempts, last }),
            result = op() => result,
            _ = time::sleep_until(deadline) => return Err(timed_out(started, attempts, last)),
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(RetryError::Failed(err));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out(started, attempts, Some(err)));
        }

        let backoff = config.backoff(attempts).min(remaining);
        tracing::debug!(
            attempt = attempts,
            backoff = ?backoff,
            error = %err,
            "retrying after retryable error"
        );

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return Err(RetryError::Cancelled { attempts, last: Some(err) });
            }
            _ = time::sleep(backoff) => {}
        }
        last = Some(err);
    }
}

fn timed_out<E: fmt::Display>(started: Instant, attempts: u32, last: Option<E>) -> RetryError<E> {
    match &last {
        Some(err) => tracing::warn!(attempts, error = %err, "giving up after retry timeout"),
        None => tracing::warn!(attempts, "giving up after retry timeout, attempt still running"),
    }
    RetryError::Timeout {
        elapsed: started.elapsed(),
        attempts,
        last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.max_backoff, Duration::from_secs(10));
        assert_eq!(config.multiplier, 2);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = RetryConfig::new().with_max_backoff(Duration::from_millis(500));

        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(400));
        assert_eq!(config.backoff(4), Duration::from_millis(500));
        assert_eq!(config.backoff(64), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Cell::new(0u32);

        let value = retry_when(
            &Context::new(),
            Duration::from_secs(30),
            &RetryConfig::default(),
            || {
                calls.set(calls.get() + 1);
                let attempt = calls.get();
                async move {
                    if attempt < 3 {
                        Err("throttled".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |err| err == "throttled",
        )
        .await
        .unwrap();

        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_fails_immediately() {
        let calls = Cell::new(0u32);

        let err = retry_when(
            &Context::new(),
            Duration::from_secs(30),
            &RetryConfig::default(),
            || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>("access denied".to_string()) }
            },
            |err| err == "throttled",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RetryError::Failed(ref e) if e == "access denied"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_returns_last_error() {
        let started = Instant::now();

        let err = retry_when(
            &Context::new(),
            Duration::from_secs(2),
            &RetryConfig::default(),
            || async { Err::<(), _>("throttled".to_string()) },
            |_| true,
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(err.into_inner(), Some("throttled".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let config = RetryConfig::new().with_initial_backoff(Duration::from_secs(60));
        let started = Instant::now();

        let err = retry_when(
            &ctx,
            Duration::from_secs(600),
            &config,
            || async { Err::<(), _>("throttled".to_string()) },
            |_| true,
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_is_abandoned_at_the_deadline() {
        let started = Instant::now();

        let err = retry_when(
            &Context::new(),
            Duration::from_secs(2),
            &RetryConfig::default(),
            || async {
                time::sleep(Duration::from_secs(3600)).await;
                Err::<(), _>("throttled".to_string())
            },
            |_| true,
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert!(matches!(err, RetryError::Timeout { attempts: 1, last: None, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_hung_attempt() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        let started = Instant::now();

        let err = retry_when(
            &ctx,
            Duration::from_secs(600),
            &RetryConfig::default(),
            || async {
                time::sleep(Duration::from_secs(3600)).await;
                Err::<(), _>("throttled".to_string())
            },
            |_| true,
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(err.into_inner().is_none());
    }
}

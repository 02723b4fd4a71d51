use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Linear backoff: the delay before attempt `n` (1-indexed) is
/// `base * n`, with no delay before the first attempt. This matches the
/// "linear multiplier per attempt" policy credential usage batches are
/// retried under.
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    base: Duration,
}

impl LinearBackoff {
    #[must_use]
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Delay to wait before the given attempt. Attempt `0` is the first
    /// try and always returns zero.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt)
    }
}

/// Retry an operation up to `max_attempts` times with linear backoff
/// between attempts, aborting early if `cancel` fires. `should_retry`
/// inspects the error to decide whether another attempt is worth making;
/// returning `false` stops the loop immediately without waiting out the
/// remaining attempts.
///
/// Returns the last `Ok` or the last `Err` observed. If `cancel` fires
/// mid-sleep, the most recent error is returned immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    backoff: LinearBackoff,
    cancel: &CancellationToken,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    let mut last_err: Option<E> = None;
    loop {
        let delay = backoff.delay_for(attempt);
        if delay > Duration::ZERO {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => {
                    debug!(attempt, "retry aborted: cancelled during backoff sleep");
                    return Err(last_err.expect("cancellation only occurs after a prior failure"));
                }
            }
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                let exhausted = attempt >= max_attempts;
                let retryable = should_retry(&err);
                if exhausted || !retryable {
                    if exhausted {
                        warn!(max_attempts, "retry attempts exhausted");
                    }
                    return Err(err);
                }
                last_err = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let backoff = LinearBackoff::new(Duration::from_millis(100));
        assert_eq!(backoff.delay_for(0), Duration::ZERO);
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn retry_stops_on_success() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let result: Result<i32, &str> = retry_with_backoff(
            3,
            LinearBackoff::new(Duration::from_millis(1)),
            &cancel,
            |_| true,
            |_attempt| {
                calls += 1;
                async move { if calls < 2 { Err("fail") } else { Ok(42) } }
            },
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let result: Result<i32, &str> = retry_with_backoff(
            3,
            LinearBackoff::new(Duration::from_millis(1)),
            &cancel,
            |_| true,
            |_attempt| {
                calls += 1;
                async move { Err("always fails") }
            },
        )
        .await;
        assert_eq!(result, Err("always fails"));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn retry_does_not_retry_non_retryable_errors() {
        let cancel = CancellationToken::new();
        let mut calls = 0;
        let result: Result<i32, &str> = retry_with_backoff(
            5,
            LinearBackoff::new(Duration::from_millis(1)),
            &cancel,
            |_| false,
            |_attempt| {
                calls += 1;
                async move { Err("permanent") }
            },
        )
        .await;
        assert_eq!(result, Err("permanent"));
        assert_eq!(calls, 1);
    }
}

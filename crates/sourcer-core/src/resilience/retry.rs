//! Bounded retries with exponential backoff and jitter.
//!
//! Retries live in the adapters, where idempotency is known; orchestration
//! layers never retry.

use std::future::Future;
use std::time::Duration;

/// Retry knobs. Delays grow as `base * 2^attempt`, capped at `max_delay`,
/// with up to 50% random jitter added when enabled.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
        let capped = exponential.min(self.max_delay.as_millis() as u64);
        if self.jitter {
            Duration::from_millis(capped + fastrand::u64(0..=capped / 2))
        } else {
            Duration::from_millis(capped)
        }
    }
}

/// Runs `operation` up to `1 + max_retries` times, sleeping between attempts.
/// `retryable` gates which errors are worth another attempt; a non-retryable
/// error returns immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= policy.max_retries || !retryable(&error) {
                    return Err(error);
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

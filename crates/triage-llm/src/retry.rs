//! Retry with configurable backoff for model calls.

use std::time::Duration;

use triage_types::TriageError;

/// Backoff policy controlling the delay between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
    /// No delay between retries.
    None,
}

impl BackoffPolicy {
    /// Compute the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => {
                let factor = 2u64.saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX));
                let millis = (base.as_millis() as u64).saturating_mul(factor);
                Duration::from_millis(millis).min(*max)
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }

    /// Delay before retrying after `error`. A provider's retry-after hint
    /// wins when it is longer than the policy delay.
    fn delay_after(&self, attempt: usize, error: &TriageError) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        match (self, error) {
            (BackoffPolicy::None, _) => delay,
            (_, TriageError::RateLimited { retry_after_ms, .. }) => {
                delay.max(Duration::from_millis(*retry_after_ms))
            }
            _ => delay,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

/// Run `f` up to `max_retries + 1` times.
///
/// Only errors satisfying [`TriageError::is_retryable`] are retried; any other
/// error, or the last retryable one, is returned as-is.
pub async fn complete_with_retry<T, F, Fut>(
    f: F,
    max_retries: usize,
    policy: &BackoffPolicy,
    label: &str,
) -> Result<T, TriageError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, TriageError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = policy.delay_after(attempt, &e);
                tracing::warn!(
                    call = %label,
                    attempt,
                    delay_ms = %delay.as_millis(),
                    error = %e,
                    "Retryable model error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Explicit retry policy values.
//!
//! Two policies coexist deliberately: element-level operations retry with
//! linear backoff, while higher-level multi-step procedures use the
//! exponential [`retry`] wrapper. They apply at different layers and are
//! kept visibly separate rather than unified.

use std::time::Duration;

use tracing::debug;

/// Backoff curve applied between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * n` after failed attempt `n`.
    Linear,
    /// `base * 2^(n-1)` after failed attempt `n`.
    Exponential,
}

/// Max attempts plus the backoff function, passed into operations as a
/// value instead of wrapping them in a decorator.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: Backoff::Linear,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: Backoff::Exponential,
        }
    }

    /// Sleep to apply after `failed_attempt` (1-based) before the next try.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let n = failed_attempt.max(1);
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(n),
            Backoff::Exponential => self.base_delay.saturating_mul(1u32 << (n - 1).min(16)),
        }
    }
}

/// Run a fallible async operation under a policy, sleeping between
/// attempts. The operation receives the 1-based attempt number.
///
/// Used for multi-step procedures (e.g. restoring the calendar view), not
/// for individual element operations; those carry their own linear policy
/// inside the interaction layer.
pub async fn retry<T, E, F>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: AsyncFnMut(u32) -> Result<T, E>,
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts => return Err(err),
            Err(err) => {
                let delay = policy.delay_after(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

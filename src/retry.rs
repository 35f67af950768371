//! # Retry Module
//!
//! Bounded retry with exponential backoff for calls to the invite authority.
//! Terminal errors stop immediately; throttling errors wait for the delay the
//! authority suggested instead of the computed one.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::link_errors::LinkError;

/// Retry configuration for invite link creation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for computed delays in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier applied for every further retry
    pub factor: u32,
    /// Add up to 25% random extra delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000, // 1 second
            max_delay_ms: 10000, // 10 seconds
            factor: 2,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Computed delay before retry number `retry` (1-based)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let multiplier = u64::from(self.factor).saturating_pow(exponent);
        let mut delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);

        if self.jitter && delay_ms > 0 {
            let extra = rand::thread_rng().gen_range(0..=delay_ms / 4);
            delay_ms = delay_ms.saturating_add(extra).min(self.max_delay_ms);
        }

        Duration::from_millis(delay_ms)
    }

    /// Delay to wait after `error` ended attempt number `retry`
    pub fn delay_after(&self, retry: u32, error: &LinkError) -> Duration {
        error
            .retry_after()
            .unwrap_or_else(|| self.delay_for_retry(retry))
    }
}

/// Run `operation` until it succeeds, fails terminally, or the policy runs out
/// of attempts. The closure receives the 1-based attempt number.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, LinkError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LinkError>>,
{
    let mut attempt = 1;
    loop {
        debug!(target_id = %label, attempt, "Starting attempt");

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt, &err);
                if let LinkError::Throttled { .. } = err {
                    warn!(
                        target_id = %label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited by the authority, waiting before retrying"
                    );
                } else {
                    debug!(
                        target_id = %label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after transient error"
                    );
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!(target_id = %label, attempt, kind = err.kind(), "Giving up");
                return Err(err);
            }
        }
    }
}

// custos-core/src/application/retry.rs

use std::time::Duration;

const BACKOFF_MAX_MS: u64 = 60_000;

/// Bounded retry with exponential backoff for transient collaborator
/// failures (crawler, query engine). Tunable so tests run in milliseconds.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(BACKOFF_MAX_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (1-based): doubles per
    /// attempt, capped at max_delay.
    pub fn compute_backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

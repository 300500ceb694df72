use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ServiceError;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1500);

/// Bounded exponential backoff. Only `RateLimited` failures are absorbed;
/// everything else goes straight back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, initial_delay: Duration) -> Self {
        Self { retries, initial_delay }
    }

    /// Wait before attempt `attempt + 1` (attempts are 1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1u32 << exp)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Runs `op` until it succeeds, fails with a non-rate-limit error,
    /// or `retries + 1` attempts have been made.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() && attempt <= self.retries => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Rate limited (attempt {}/{}), retrying in {}ms",
                        attempt,
                        self.max_attempts(),
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

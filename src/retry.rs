// Bounded retry with linear backoff.
// Shared by every fallback tier of the resolver.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Number of attempts and the base delay between them.
///
/// The wait after attempt `n` is `base_delay * n`; there is no wait after
/// the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub const fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Delay to wait after the given (1-based) attempt fails.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Run `op` until it yields `Some` or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let attempts = self.attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(value) = op(attempt).await {
                return Some(value);
            }
            if attempt < attempts {
                let delay = self.delay_after(attempt);
                debug!(label, attempt, delay_ms = delay.as_millis() as u64, "Retrying");
                tokio::time::sleep(delay).await;
            }
        }
        None
    }
}

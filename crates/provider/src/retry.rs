use std::future::Future;
use std::time::Duration;

use pagerform_api::ApiError;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Wall-clock budget for retrying team membership changes.
pub const TEAM_MEMBERSHIP_RETRY_TIMEOUT: Duration = Duration::from_secs(120);

/// Wait between attempts of a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Doubles after every attempt, starting at `initial` and capped at `max`.
    Exponential { initial: Duration, max: Duration },
    /// The same wait every time.
    Constant { delay: Duration },
}

impl RetryStrategy {
    /// Wait after the zero-based `attempt`, never longer than `remaining`.
    pub fn next_delay(&self, attempt: u32, remaining: Duration) -> Duration {
        let delay = match self {
            Self::Exponential { initial, max } => 1u32
                .checked_shl(attempt)
                .and_then(|factor| initial.checked_mul(factor))
                .map_or(*max, |d| d.min(*max)),
            Self::Constant { delay } => *delay,
        };
        delay.min(remaining)
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

/// Retries an API call on HTTP 5xx until it succeeds, fails with any other
/// error, or the deadline passes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    timeout: Duration,
    strategy: RetryStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(TEAM_MEMBERSHIP_RETRY_TIMEOUT)
    }
}

impl RetryPolicy {
    /// Policy with the given wall-clock budget and the default backoff.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            strategy: RetryStrategy::default(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `op` until it succeeds or gives up.
    ///
    /// Sleeps are clamped to the time left, so the last attempt happens at
    /// the deadline. Once the deadline has passed the error of the final
    /// attempt is returned inside [`ProviderError::RetryTimeout`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_server_error() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!(operation, attempts = attempt + 1, error = %e, "retry deadline exceeded");
                        return Err(ProviderError::RetryTimeout {
                            operation: operation.to_owned(),
                            timeout: self.timeout,
                            last: e,
                        });
                    }

                    let delay = self.strategy.next_delay(attempt, remaining);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retryable server error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

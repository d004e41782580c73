//! Bounded retry with exponential backoff, modeled as an explicit state
//! machine so the policy is the same whether the wrapped call is a model
//! completion or a live provider request.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Pending,
    Retrying(u32),
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: anyhow::Error,
}

impl std::fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {:#}",
            self.attempts, self.last
        )
    }
}

impl std::error::Error for RetryExhausted {}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay before retry number `n` (1-based): base * 2^(n-1).
    pub fn delay_for(&self, retry_no: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry_no.saturating_sub(1))
    }

    /// Drives `op` through Pending -> Retrying(n) -> Succeeded | Failed.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut state = RetryState::Pending;
        let mut last: Option<anyhow::Error> = None;

        loop {
            let attempt = match state {
                RetryState::Pending => 0,
                RetryState::Retrying(n) => {
                    tokio::time::sleep(self.delay_for(n)).await;
                    n
                }
                RetryState::Succeeded | RetryState::Failed => break,
            };

            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    tracing::debug!(attempt = attempt + 1, error = %e, "attempt failed");
                    last = Some(e);
                    if attempt + 1 >= self.max_attempts {
                        state = RetryState::Failed;
                    } else {
                        state = RetryState::Retrying(attempt + 1);
                    }
                }
            }
        }

        Err(RetryExhausted {
            attempts: self.max_attempts,
            last: last.unwrap_or_else(|| anyhow::anyhow!("no attempts were made")),
        })
    }
}

//! Process-wide rate-limit budgets for the live data providers.

use crate::errors::FailureReason;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A windowed request budget shared by every worker issuing live calls.
///
/// `acquire` consumes one unit. When the window is exhausted it either waits
/// for the window to roll over (if that is imminent) or rejects, so no two
/// workers can independently assume the full quota.
pub struct RateLimitBudget {
    capacity: u32,
    window: Duration,
    max_wait: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    used: u32,
    window_start: Instant,
}

impl RateLimitBudget {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            max_wait: Duration::from_secs(2),
            state: Mutex::new(WindowState {
                used: 0,
                window_start: Instant::now(),
            }),
        }
    }

    pub fn per_day(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(24 * 60 * 60))
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn remaining(&self) -> u32 {
        let s = self.state.lock().unwrap();
        self.capacity.saturating_sub(s.used)
    }

    pub async fn acquire(&self) -> Result<(), FailureReason> {
        loop {
            let wait = {
                let mut s = self.state.lock().unwrap();
                let now = Instant::now();
                if now.duration_since(s.window_start) >= self.window {
                    s.window_start = now;
                    s.used = 0;
                }
                if s.used < self.capacity {
                    s.used += 1;
                    return Ok(());
                }
                let elapsed = now.duration_since(s.window_start);
                let left = self.window.saturating_sub(elapsed);
                if left > self.max_wait {
                    tracing::warn!(
                        capacity = self.capacity,
                        window_secs = self.window.as_secs(),
                        "rate-limit budget exhausted"
                    );
                    return Err(FailureReason::RateLimitExceeded);
                }
                left
            };
            // Window rollover is close enough to queue for.
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_spends_the_budget() {
        let budget = RateLimitBudget::per_day(2);
        assert!(budget.acquire().await.is_ok());
        assert!(budget.acquire().await.is_ok());
        assert_eq!(budget.remaining(), 0);
        assert_eq!(
            budget.acquire().await.unwrap_err(),
            FailureReason::RateLimitExceeded
        );
    }

    #[tokio::test]
    async fn short_windows_queue_instead_of_rejecting() {
        let budget = RateLimitBudget::new(1, Duration::from_millis(100))
            .with_max_wait(Duration::from_millis(200));
        assert!(budget.acquire().await.is_ok());
        // Second acquire waits for the window to roll over.
        assert!(budget.acquire().await.is_ok());
    }
}

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Bounded polling: `attempts` checks, sleeping `interval` (scaled by
/// `backoff` after each miss) in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub interval: Duration,
    pub backoff: f64,
}

impl WaitPolicy {
    pub const fn fixed(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            interval,
            backoff: 1.0,
        }
    }
}

pub async fn wait_for<T, F, Fut>(policy: &WaitPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let mut delay = policy.interval;
    for attempt in 0..policy.attempts {
        if let Some(value) = probe().await {
            return Some(value);
        }
        tracing::trace!(attempt, "condition not met");
        sleep(delay).await;
        if policy.backoff > 1.0 {
            delay = delay.mul_f64(policy.backoff);
        }
    }
    None
}

/// Trusts a condition only after `required` consecutive hits spaced by
/// `interval`, giving up after `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityProbe {
    pub required: u32,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for StabilityProbe {
    fn default() -> Self {
        Self {
            required: 3,
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(60),
        }
    }
}

impl StabilityProbe {
    pub async fn observe<T, F, Fut>(&self, mut check: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut streak = 0u32;
        while Instant::now() < deadline {
            match check().await {
                Some(value) => {
                    streak += 1;
                    tracing::debug!(streak, required = self.required, "condition stable");
                    if streak >= self.required {
                        return Some(value);
                    }
                }
                None => {
                    if streak > 0 {
                        tracing::debug!(streak, "stability streak reset");
                    }
                    streak = 0;
                }
            }
            sleep(self.interval).await;
        }
        None
    }
}

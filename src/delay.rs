use rand::RngExt;
use std::time::Duration;

/// How long to wait between consecutive requests to the site
pub trait DelayPolicy: Send + Sync {
    /// Delay before the `attempt`-th follow-up (0-based)
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Uniformly random delay within `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomDelay {
    pub min: Duration,
    pub max: Duration,
}

impl RandomDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }
}

impl DelayPolicy for RandomDelay {
    fn next_delay(&self, _attempt: u32) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis =
            rand::rng().random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayPolicy for NoDelay {
    fn next_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Sleep for whatever the policy says, skipping the timer entirely for zero
pub async fn pause(policy: &dyn DelayPolicy, attempt: u32) {
    let delay = policy.next_delay(attempt);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

use rand::Rng;
use std::time::Duration;

/// Randomized human-like waits between page interactions. Doubles as the
/// backpressure that keeps request rates under the sites' limits.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    enabled: bool,
}

impl Pacer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sleep for a uniformly random duration in `[min_ms, max_ms]`.
    pub async fn pause(&self, min_ms: u64, max_ms: u64) {
        if !self.enabled {
            return;
        }
        tokio::time::sleep(random_delay(min_ms, max_ms)).await;
    }
}

pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

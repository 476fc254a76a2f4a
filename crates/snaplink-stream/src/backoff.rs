use std::time::Duration;

/// Bounded backoff policy for recoverable stream faults.
///
/// The delay grows linearly with the attempt number and saturates at
/// `max_delay`, so a persistently failing source never spirals into
/// unbounded pauses and never hammers the service in a tight loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay to apply before the given retry attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self
            .base_delay
            .checked_mul(attempt.max(1))
            .unwrap_or(self.max_delay);
        scaled.min(self.max_delay)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

//! Fixed-rate gate for per-frame work

use std::time::Duration;

/// Lets work through at most once per interval of a monotonic clock
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Duration>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Limiter for `hz` runs per second
    pub fn per_second(hz: f32) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 1.0 };
        Self::new(Duration::from_secs_f32(1.0 / hz))
    }

    /// Returns true and arms the gate if `now` is at least one interval past the last run
    pub fn ready(&mut self, now: Duration) -> bool {
        match self.last {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Next call to `ready` passes regardless of timing
    pub fn force(&mut self) {
        self.last = None;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

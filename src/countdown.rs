// Countdown to the next scheduled fetch. Time is always passed in, never read here.

use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    duration: Duration,
    deadline: Instant,
}

impl Countdown {
    /// Starts a countdown of `duration` at `now`.
    pub fn start(duration: Duration, now: Instant) -> Self {
        Self {
            duration,
            deadline: now + duration,
        }
    }

    /// A countdown that is already at zero, so the first check fires immediately.
    pub fn elapsed(duration: Duration, now: Instant) -> Self {
        Self {
            duration,
            deadline: now,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Restarts from the full duration.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = now + self.duration;
    }

    /// Time left, saturating at zero.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn remaining_millis(&self, now: Instant) -> u64 {
        self.remaining(now).as_millis() as u64
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

// Poll session state machine: Idle -> Polling -> Stopped.
// Pure and synchronous; the async loop in `poller` feeds it time and fetch results.

use tokio::time::{Duration, Instant};

use crate::countdown::Countdown;
use crate::models::{AggregateSummary, PollerState, ProgressView};

/// What started a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Scheduled,
    Manual,
}

#[derive(Debug)]
pub struct PollSession {
    state: PollerState,
    countdown: Countdown,
    in_flight: Option<FetchTrigger>,
    summary: Option<AggregateSummary>,
    last_error: Option<String>,
    updated_at: Option<u64>,
    fetch_count: u64,
}

impl PollSession {
    /// New session whose first fetch is due immediately.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            state: PollerState::Idle,
            countdown: Countdown::elapsed(interval, now),
            in_flight: None,
            summary: None,
            last_error: None,
            updated_at: None,
            fetch_count: 0,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn summary(&self) -> Option<&AggregateSummary> {
        self.summary.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn in_flight(&self) -> Option<FetchTrigger> {
        self.in_flight
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_count
    }

    /// When the next scheduled fetch is due. `None` while a fetch is in flight or once stopped.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state == PollerState::Stopped || self.in_flight.is_some() {
            return None;
        }
        Some(self.countdown.deadline())
    }

    /// Timer check. Returns true when a scheduled fetch should start now;
    /// the caller must then run exactly one fetch and report it via `complete`.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.state == PollerState::Stopped
            || self.in_flight.is_some()
            || !self.countdown.is_expired(now)
        {
            return false;
        }
        self.begin(FetchTrigger::Scheduled);
        true
    }

    /// Manual refresh. Resets the countdown; returns true when a fetch should
    /// start, false when one is already in flight.
    pub fn request_refresh(&mut self, now: Instant) -> bool {
        self.countdown.reset(now);
        if self.in_flight.is_some() {
            return false;
        }
        self.begin(FetchTrigger::Manual);
        true
    }

    fn begin(&mut self, trigger: FetchTrigger) {
        self.in_flight = Some(trigger);
        self.fetch_count += 1;
    }

    /// Records the outcome of the in-flight fetch and restarts the countdown.
    /// Failures keep the previous summary and never change state.
    pub fn complete(
        &mut self,
        result: Result<AggregateSummary, String>,
        now: Instant,
        wall_clock_ms: u64,
    ) {
        self.in_flight = None;
        self.countdown.reset(now);
        match result {
            Ok(summary) => {
                if self.state != PollerState::Stopped {
                    self.state = if summary.is_complete() {
                        PollerState::Stopped
                    } else {
                        PollerState::Polling
                    };
                }
                self.summary = Some(summary);
                self.last_error = None;
                self.updated_at = Some(wall_clock_ms);
            }
            Err(e) => {
                self.last_error = Some(e);
            }
        }
    }

    /// Forgets an in-flight fetch that was cancelled before it reported back.
    pub fn abandon_in_flight(&mut self) {
        self.in_flight = None;
    }

    pub fn view(&self, now: Instant) -> ProgressView {
        let remaining_millis = match (self.state, self.in_flight) {
            (PollerState::Stopped, _) => None,
            (_, Some(_)) => Some(self.countdown.duration().as_millis() as u64),
            (_, None) => Some(self.countdown.remaining_millis(now)),
        };
        let summary = self.summary;
        ProgressView {
            state: self.state,
            summary,
            finished: summary.map(|s| s.finished()).unwrap_or(0),
            percent_complete: summary.map(|s| s.percent_complete()).unwrap_or(0.0),
            headline: summary.map(|s| s.headline()),
            breakdown: summary.map(|s| s.breakdown()).unwrap_or_default(),
            remaining_millis,
            refreshing: self.in_flight.is_some(),
            stale: self.last_error.is_some(),
            last_error: self.last_error.clone(),
            updated_at: self.updated_at,
            fetch_count: self.fetch_count,
        }
    }
}

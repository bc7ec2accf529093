// Poller state and the view published to the display layer

use serde::{Deserialize, Serialize};

use super::{AggregateSummary, BreakdownRow};

/// Lifecycle of a poll session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    /// No successful fetch yet.
    #[default]
    Idle,
    /// Timer active, waiting for the next fetch.
    Polling,
    /// Every run finished; no more scheduled fetches.
    Stopped,
}

/// Everything a renderer needs for one frame of the progress widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub state: PollerState,
    /// Last successful aggregate; `None` until the first fetch succeeds.
    pub summary: Option<AggregateSummary>,
    #[serde(default)]
    pub finished: u64,
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub breakdown: Vec<BreakdownRow>,
    /// Milliseconds until the next scheduled fetch; `None` once stopped.
    pub remaining_millis: Option<u64>,
    /// A fetch is in flight.
    pub refreshing: bool,
    /// The last fetch failed, so `summary` is from an earlier cycle.
    pub stale: bool,
    pub last_error: Option<String>,
    /// Unix millis of the last successful fetch.
    pub updated_at: Option<u64>,
    /// Number of fetches issued so far (scheduled and manual).
    #[serde(default)]
    pub fetch_count: u64,
}

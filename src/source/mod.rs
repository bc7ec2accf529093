// Run sources: where the poller gets its runs from

mod graphql;

pub use graphql::{GraphqlSource, RUNS_QUERY, parse_runs_response};

use std::future::Future;

use crate::models::{RunFilter, RunRecord};

/// Why a fetch produced no runs. Every variant is recoverable: the poller keeps
/// its last good summary and tries again on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("invalid run filter: {0}")]
    InvalidFilter(String),
    #[error("internal server error: {0}")]
    Internal(String),
    #[error("graphql error: {0}")]
    Graphql(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = e.status() {
            SourceError::Status(status.as_u16())
        } else if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

/// Supplies the runs matching a filter.
pub trait RunSource: Send + Sync + 'static {
    fn fetch(
        &self,
        filter: &RunFilter,
    ) -> impl Future<Output = Result<Vec<RunRecord>, SourceError>> + Send;
}

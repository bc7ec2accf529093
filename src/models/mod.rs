// Domain models

mod progress;
mod run;
mod summary;

pub use progress::{PollerState, ProgressView};
pub use run::{DEFAULT_RUN_LIMIT, RunFilter, RunRecord, RunStatus, Tag};
pub use summary::{AggregateSummary, BreakdownRow, StatusBucket};

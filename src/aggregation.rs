// Status classification and pure aggregation over a batch of runs.

use crate::models::{AggregateSummary, RunRecord, RunStatus, StatusBucket};

/// Maps a run status to the bucket it is counted under.
pub fn classify(status: &RunStatus) -> StatusBucket {
    match status {
        RunStatus::Queued => StatusBucket::Queued,
        RunStatus::Starting | RunStatus::Started | RunStatus::Canceling => {
            StatusBucket::InProgress
        }
        RunStatus::Success => StatusBucket::Succeeded,
        RunStatus::Failure | RunStatus::Canceled => StatusBucket::Failed,
        RunStatus::NotStarted | RunStatus::Managed | RunStatus::Unknown(_) => {
            StatusBucket::Unclassified
        }
    }
}

/// Counts `records` per bucket. Every record lands in exactly one bucket,
/// unclassified ones included, so the counts always sum to `total`.
pub fn aggregate(records: &[RunRecord]) -> AggregateSummary {
    records
        .iter()
        .fold(AggregateSummary::default(), |mut summary, record| {
            summary.increment(classify(&record.status));
            summary
        })
}

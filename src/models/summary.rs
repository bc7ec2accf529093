// Aggregate summary over one batch of runs

use serde::{Deserialize, Serialize};

/// Display category a run status is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusBucket {
    Queued,
    InProgress,
    Succeeded,
    Failed,
    /// Statuses outside the four display categories (e.g. NOT_STARTED, MANAGED, unknown values).
    Unclassified,
}

impl StatusBucket {
    /// Display order of the breakdown table.
    pub const ALL: [StatusBucket; 5] = [
        StatusBucket::Queued,
        StatusBucket::InProgress,
        StatusBucket::Succeeded,
        StatusBucket::Failed,
        StatusBucket::Unclassified,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatusBucket::Queued => "Queued",
            StatusBucket::InProgress => "In progress",
            StatusBucket::Succeeded => "Succeeded",
            StatusBucket::Failed => "Failed",
            StatusBucket::Unclassified => "Other",
        }
    }
}

/// Counts per bucket. `total` is the number of records fetched, so the five
/// bucket counts always add up to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub queued: u64,
    pub in_progress: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub unclassified: u64,
    pub total: u64,
}

/// One non-empty row of the breakdown table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    pub bucket: StatusBucket,
    pub label: String,
    pub count: u64,
    pub total: u64,
}

impl AggregateSummary {
    pub fn count(&self, bucket: StatusBucket) -> u64 {
        match bucket {
            StatusBucket::Queued => self.queued,
            StatusBucket::InProgress => self.in_progress,
            StatusBucket::Succeeded => self.succeeded,
            StatusBucket::Failed => self.failed,
            StatusBucket::Unclassified => self.unclassified,
        }
    }

    pub(crate) fn increment(&mut self, bucket: StatusBucket) {
        match bucket {
            StatusBucket::Queued => self.queued += 1,
            StatusBucket::InProgress => self.in_progress += 1,
            StatusBucket::Succeeded => self.succeeded += 1,
            StatusBucket::Failed => self.failed += 1,
            StatusBucket::Unclassified => self.unclassified += 1,
        }
        self.total += 1;
    }

    /// Runs in a terminal state (succeeded + failed).
    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Finished fraction in `[0, 1]`; 0 for an empty batch.
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.finished() as f64 / self.total as f64
    }

    /// True once every fetched run is finished. An empty batch is never complete.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.finished() == self.total
    }

    /// e.g. "3/5 runs done (60.0%)"
    pub fn headline(&self) -> String {
        format!(
            "{}/{} runs done ({:.1}%)",
            self.finished(),
            self.total,
            self.percent_complete() * 100.0
        )
    }

    /// Rows for the per-bucket breakdown; buckets with a zero count are left out.
    pub fn breakdown(&self) -> Vec<BreakdownRow> {
        StatusBucket::ALL
            .iter()
            .filter_map(|&bucket| {
                let count = self.count(bucket);
                (count > 0).then(|| BreakdownRow {
                    bucket,
                    label: bucket.label().to_string(),
                    count,
                    total: self.total,
                })
            })
            .collect()
    }
}

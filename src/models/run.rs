// Run records, run statuses and the filter used to select them

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default result limit; large enough to cover a whole backfill in one query.
pub const DEFAULT_RUN_LIMIT: u32 = 100_000;

/// Lifecycle status of a run as reported by the run store.
/// Serializes to the store's SCREAMING_SNAKE_CASE names; values this crate does
/// not know survive as `Unknown` instead of failing the whole fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    NotStarted,
    Managed,
    Starting,
    Started,
    Success,
    Failure,
    Canceling,
    Canceled,
    /// A status name outside the set above. Build statuses with `RunStatus::from`,
    /// which never puts a known name here; `Unknown("QUEUED")` would read back as `Queued`.
    Unknown(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "QUEUED",
            RunStatus::NotStarted => "NOT_STARTED",
            RunStatus::Managed => "MANAGED",
            RunStatus::Starting => "STARTING",
            RunStatus::Started => "STARTED",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failure => "FAILURE",
            RunStatus::Canceling => "CANCELING",
            RunStatus::Canceled => "CANCELED",
            RunStatus::Unknown(s) => s,
        }
    }
}

impl From<&str> for RunStatus {
    fn from(s: &str) -> Self {
        match s {
            "QUEUED" => RunStatus::Queued,
            "NOT_STARTED" => RunStatus::NotStarted,
            "MANAGED" => RunStatus::Managed,
            "STARTING" => RunStatus::Starting,
            "STARTED" => RunStatus::Started,
            "SUCCESS" => RunStatus::Success,
            "FAILURE" => RunStatus::Failure,
            "CANCELING" => RunStatus::Canceling,
            "CANCELED" => RunStatus::Canceled,
            other => RunStatus::Unknown(other.to_string()),
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        RunStatus::from(s.as_str())
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run as returned by a fetch. Owned by the poller for a single cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub status: RunStatus,
}

impl RunRecord {
    pub fn new(id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }
}

/// A `key=value` run tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// Parses a `key=value` token. Splits on the first `=`; the key must be non-empty.
    pub fn parse(token: &str) -> Option<Self> {
        let (key, value) = token.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Selects the runs whose progress is tracked: one pipeline, all of `tags`, at most `limit` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFilter {
    pub pipeline_name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub limit: u32,
}

impl RunFilter {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            tags: Vec::new(),
            limit: DEFAULT_RUN_LIMIT,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Space-separated `key=value` tokens, as typed into a run-list search box.
    pub fn runs_query(&self) -> String {
        self.tags
            .iter()
            .map(Tag::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

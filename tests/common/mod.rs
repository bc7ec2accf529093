// Shared test helpers: scripted run source and record builders

#![allow(dead_code)]

use runprogress::models::{RunFilter, RunRecord, RunStatus};
use runprogress::source::{RunSource, SourceError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Duration;

pub fn runs(statuses: &[RunStatus]) -> Vec<RunRecord> {
    statuses
        .iter()
        .enumerate()
        .map(|(i, s)| RunRecord::new(format!("run-{i}"), s.clone()))
        .collect()
}

pub fn filter() -> RunFilter {
    RunFilter::new("backfill_job").with_tag("dagster/backfill", "bf-1")
}

/// Returns scripted results in order, then `steady` forever.
/// Tracks calls, completions and the peak number of concurrent fetches.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<RunRecord>, SourceError>>>,
    steady: Vec<RunRecord>,
    delay: Duration,
    panic_on_call: Option<usize>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    filters: Mutex<Vec<RunFilter>>,
}

impl ScriptedSource {
    pub fn new(steady: Vec<RunRecord>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            steady,
            delay: Duration::ZERO,
            panic_on_call: None,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(self, script: Vec<Result<Vec<RunRecord>, SourceError>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panics inside `fetch` on the given 1-based call instead of answering.
    pub fn with_panic_on_call(mut self, call: usize) -> Self {
        self.panic_on_call = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<RunFilter> {
        self.filters.lock().unwrap().clone()
    }
}

impl RunSource for ScriptedSource {
    async fn fetch(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on_call == Some(call) {
            panic!("scripted source panicked on call {call}");
        }
        self.filters.lock().unwrap().push(filter.clone());
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Ok(self.steady.clone()))
    }
}

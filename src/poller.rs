// Background poll loop: owns one PollSession, runs at most one fetch at a time,
// and publishes a ProgressView on every change and every view tick.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval, sleep_until, timeout};
use tracing::{Instrument, debug, info, instrument, warn};

use crate::aggregation::aggregate;
use crate::models::{PollerState, ProgressView, RunFilter, RunRecord};
use crate::session::PollSession;
use crate::source::{RunSource, SourceError};

/// Pending refresh requests beyond this are dropped; one queued refresh is as good as many.
const COMMAND_CHANNEL_CAPACITY: usize = 8;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll loop timing and the filter it polls.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub filter: RunFilter,
    pub interval: Duration,
    /// How often the view is republished so the countdown keeps moving.
    pub view_tick: Duration,
    /// Upper bound on one fetch; a source that never answers counts as a timeout.
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Refresh,
}

/// Cloneable access to a running poller: read views, request refreshes.
#[derive(Debug, Clone)]
pub struct PollerClient {
    commands: mpsc::Sender<Command>,
    views: watch::Receiver<ProgressView>,
}

impl PollerClient {
    /// Asks for an immediate fetch. Returns false if the poller is gone.
    pub fn refresh_now(&self) -> bool {
        match self.commands.try_send(Command::Refresh) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("refresh already queued");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn current(&self) -> ProgressView {
        self.views.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressView> {
        self.views.clone()
    }
}

/// Owner of a running poller. Dropping it tears the poller down.
#[derive(Debug)]
pub struct PollerHandle {
    client: PollerClient,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn client(&self) -> PollerClient {
        self.client.clone()
    }

    pub fn refresh_now(&self) -> bool {
        self.client.refresh_now()
    }

    pub fn current(&self) -> ProgressView {
        self.client.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressView> {
        self.client.subscribe()
    }

    /// Stops the timer, cancels any in-flight fetch and waits for the loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "poller task ended abnormally");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawns the poll loop for `source`. The first fetch starts immediately.
pub fn spawn<S: RunSource>(source: Arc<S>, config: PollerConfig) -> PollerHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (view_tx, view_rx) = watch::channel(ProgressView::default());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(run(source, config, command_rx, view_tx, shutdown_rx));

    PollerHandle {
        client: PollerClient {
            commands: command_tx,
            views: view_rx,
        },
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

type FetchResult = Result<Vec<RunRecord>, SourceError>;

#[instrument(
    skip_all,
    fields(pipeline = %config.filter.pipeline_name, interval_ms = config.interval.as_millis() as u64)
)]
async fn run<S: RunSource>(
    source: Arc<S>,
    config: PollerConfig,
    mut command_rx: mpsc::Receiver<Command>,
    view_tx: watch::Sender<ProgressView>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut in_flight: Option<JoinHandle<FetchResult>> = None;
    let mut session = PollSession::new(config.interval, Instant::now());

    let mut view_tick = interval(config.view_tick.max(Duration::from_millis(1)));
    view_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("poller started");

    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("poller shutting down");
                break;
            }
            command = command_rx.recv() => {
                match command {
                    Some(Command::Refresh) => {
                        if session.request_refresh(Instant::now()) {
                            debug!(operation = "fetch_runs", trigger = "manual", "refresh requested");
                            in_flight = Some(start_fetch(&source, &config.filter, config.fetch_timeout));
                        } else {
                            debug!("refresh ignored; fetch already in flight");
                        }
                    }
                    None => {
                        debug!("all poller clients dropped");
                        break;
                    }
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if session.tick(Instant::now()) {
                    debug!(operation = "fetch_runs", trigger = "scheduled", "countdown elapsed");
                    in_flight = Some(start_fetch(&source, &config.filter, config.fetch_timeout));
                }
            }
            Some(joined) = async {
                match in_flight.as_mut() {
                    Some(task) => Some(task.await),
                    None => None,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                let previous = session.state();
                let outcome = match joined {
                    Ok(Ok(records)) => Ok(aggregate(&records)),
                    Ok(Err(e)) => {
                        warn!(error = %e, operation = "fetch_runs", "fetch failed; keeping last summary");
                        Err(e.to_string())
                    }
                    Err(e) => {
                        warn!(error = %e, operation = "fetch_runs", "fetch task died; keeping last summary");
                        Err(format!("fetch task failed: {e}"))
                    }
                };
                session.complete(outcome, Instant::now(), unix_millis());
                if let Some(summary) = session.summary() {
                    debug!(
                        total = summary.total,
                        finished = summary.finished(),
                        queued = summary.queued,
                        in_progress = summary.in_progress,
                        unclassified = summary.unclassified,
                        "runs aggregated"
                    );
                }
                if previous != session.state() {
                    info!(from = ?previous, to = ?session.state(), "poller state changed");
                }
                if session.state() == PollerState::Stopped && previous != PollerState::Stopped {
                    info!("all runs finished; automatic polling stopped");
                }
            }
            _ = view_tick.tick() => {}
        }
        view_tx.send_replace(session.view(Instant::now()));
    }

    if let Some(task) = in_flight.take() {
        task.abort();
        session.abandon_in_flight();
    }
    view_tx.send_replace(session.view(Instant::now()));
}

fn start_fetch<S: RunSource>(
    source: &Arc<S>,
    filter: &RunFilter,
    fetch_timeout: Duration,
) -> JoinHandle<FetchResult> {
    let source = Arc::clone(source);
    let filter = filter.clone();
    tokio::spawn(
        async move {
            let started = Instant::now();
            let result = timeout(fetch_timeout, source.fetch(&filter))
                .await
                .unwrap_or(Err(SourceError::Timeout));
            debug!(
                operation = "fetch_runs",
                duration_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "fetch finished"
            );
            result
        }
        .in_current_span(),
    )
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

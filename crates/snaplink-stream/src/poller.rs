//! Per-source polling orchestration.
//!
//! One independent, non-overlapping polling loop runs per configured
//! [`Source`]. Loops never share mutable state; each owns its own
//! cursor slot exclusively, and a fault in one loop never affects
//! another. The interval timer is rearmed only after the previous
//! iteration has fully completed, so fetches against the same cursor
//! never overlap.

use crate::backoff::Backoff;
use crate::consumer::EventConsumer;
use crate::cursor::{CursorState, CursorStore};
use crate::event::Batch;
use crate::normalize;
use crate::reader::{ChangeLogReader, CursorPosition, StreamError};
use crate::snapshot::SnapshotReader;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

/// How a source's rows are ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Tail the table's change log with a resumable cursor.
    ChangeLog,
    /// Re-enumerate the whole table every cycle. No cursor involved.
    Snapshot,
}

/// One pollable origin: a table's change stream bound to exactly one
/// consumer. Built at process startup from static configuration and
/// immutable thereafter.
#[derive(TypedBuilder)]
pub struct Source {
    #[builder(setter(into))]
    name: String,
    #[builder(setter(into))]
    table: String,
    /// Wire name of the row's identifying key attribute; records
    /// lacking it in their new-image are skipped during normalization.
    #[builder(setter(into))]
    key_attribute: String,
    mode: IngestMode,
    #[builder(default = Duration::from_secs(2))]
    interval: Duration,
    consumer: Arc<dyn EventConsumer>,
}

impl Source {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// What a single poll iteration resolved to. Drives the loop's pacing
/// and gives tests a synchronous view of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The table has no active log (or no shards) yet; retry later.
    WaitingForLog,
    /// A fresh cursor was established at `Latest`. The first real
    /// fetch happens next cycle, so a cold start tails only future
    /// changes instead of backfilling history.
    Positioned,
    /// A non-empty batch was normalized and dispatched.
    Delivered(usize),
    /// The fetch succeeded but yielded no events; the consumer was
    /// not invoked.
    Empty,
    /// The shard is permanently closed; full re-discovery follows.
    ShardClosed,
    /// The cursor was re-acquired at `EarliestRetained` after a trim.
    RecoveredFromTrim,
    /// The cursor aged out; state cleared for full re-discovery.
    CursorExpired,
    /// A transient fault; cursor untouched, retry after backoff.
    BackingOff,
    /// A misconfiguration surfaced to the operator; the loop keeps
    /// running but will keep failing until configuration changes.
    Fatal,
}

/// The orchestrator: decides per iteration whether to tail the log or
/// scan a snapshot, advances the cursor store, and hands normalized
/// batches to the source's consumer.
pub struct Poller<L, S> {
    log_reader: Arc<L>,
    snapshot_reader: Arc<S>,
    cursors: CursorStore,
    backoff: Backoff,
    /// Fixed pause after trim recovery, so the loop does not spin
    /// against a service still catching up.
    trim_settle: Duration,
}

impl<L: ChangeLogReader, S: SnapshotReader> Poller<L, S> {
    pub fn new(log_reader: Arc<L>, snapshot_reader: Arc<S>) -> Self {
        Self {
            log_reader,
            snapshot_reader,
            cursors: CursorStore::new(),
            backoff: Backoff::default(),
            trim_settle: Duration::from_secs(1),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_trim_settle(mut self, trim_settle: Duration) -> Self {
        self.trim_settle = trim_settle;
        self
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    /// Starts one polling task per source. Tasks run until shutdown;
    /// in-flight iterations are allowed to finish rather than aborted
    /// mid-consumer-call.
    pub fn spawn(self, sources: Vec<Source>) -> PollerHandle {
        let poller = Arc::new(self);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = sources
            .into_iter()
            .map(|source| {
                let poller = Arc::clone(&poller);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(poller.run_source(source, shutdown))
            })
            .collect();

        PollerHandle { shutdown_tx, tasks }
    }

    async fn run_source(self: Arc<Self>, source: Source, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = source.name(),
            table = source.table(),
            mode = ?source.mode(),
            interval_ms = source.interval().as_millis() as u64,
            "starting poll loop"
        );

        let mut transient_attempts: u32 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.poll_source_once(&source).await;
            debug!(source = source.name(), outcome = ?outcome, "poll iteration finished");

            let extra_pause = match outcome {
                IterationOutcome::BackingOff => {
                    transient_attempts = transient_attempts.saturating_add(1);
                    Some(self.backoff.delay_for(transient_attempts))
                }
                IterationOutcome::RecoveredFromTrim => {
                    transient_attempts = 0;
                    Some(self.trim_settle)
                }
                _ => {
                    transient_attempts = 0;
                    None
                }
            };
            if let Some(pause) = extra_pause {
                tokio::time::sleep(pause).await;
            }

            // Rearm the interval only after the iteration has fully
            // completed, so a slow fetch or consumer never overlaps
            // with the next cycle.
            tokio::select! {
                _ = tokio::time::sleep(source.interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(source = source.name(), "poll loop stopped");
    }

    /// Runs one iteration of the source's state machine. No pacing
    /// happens here; the loop applies interval and backoff delays
    /// based on the returned outcome.
    pub async fn poll_source_once(&self, source: &Source) -> IterationOutcome {
        match source.mode {
            IngestMode::Snapshot => self.poll_snapshot(source).await,
            IngestMode::ChangeLog => self.poll_change_log(source).await,
        }
    }

    async fn poll_snapshot(&self, source: &Source) -> IterationOutcome {
        let rows = match self.snapshot_reader.scan_table(&source.table).await {
            Ok(rows) => rows,
            Err(err) => return fault_outcome(source, "snapshot scan", &err),
        };

        let batch = normalize::snapshot_batch(rows, &source.name, &source.key_attribute);
        self.deliver(source, batch).await
    }

    async fn poll_change_log(&self, source: &Source) -> IterationOutcome {
        let state = self.cursors.get(&source.name);
        let Some((log, shard, cursor)) = state.position() else {
            return self.establish_position(source).await;
        };
        let (log, shard) = (log.clone(), shard.clone());

        match self.log_reader.fetch_next(cursor).await {
            Ok(outcome) => {
                let batch = normalize::log_batch(outcome.records, &source.name, &source.key_attribute);
                let delivered = self.deliver(source, batch).await;

                match outcome.next_cursor {
                    Some(next) => {
                        self.cursors
                            .set(&source.name, CursorState::positioned(log, shard, next));
                        delivered
                    }
                    None => {
                        info!(
                            source = source.name(),
                            shard = shard.as_str(),
                            "shard closed; rediscovering next cycle"
                        );
                        self.cursors.invalidate(&source.name);
                        IterationOutcome::ShardClosed
                    }
                }
            }
            Err(StreamError::Trimmed(reason)) => {
                warn!(
                    source = source.name(),
                    reason = reason.as_str(),
                    "cursor trimmed; re-acquiring at earliest retained position"
                );
                match self
                    .log_reader
                    .acquire_cursor(&log, &shard, CursorPosition::EarliestRetained)
                    .await
                {
                    Ok(cursor) => {
                        self.cursors
                            .set(&source.name, CursorState::positioned(log, shard, cursor));
                        IterationOutcome::RecoveredFromTrim
                    }
                    Err(err) => {
                        self.cursors.invalidate(&source.name);
                        fault_outcome(source, "trim recovery", &err)
                    }
                }
            }
            Err(StreamError::Expired(reason)) => {
                warn!(
                    source = source.name(),
                    reason = reason.as_str(),
                    "cursor expired; clearing state for full rediscovery"
                );
                self.cursors.invalidate(&source.name);
                IterationOutcome::CursorExpired
            }
            Err(err) => fault_outcome(source, "fetch", &err),
        }
    }

    /// Step 2 of the state machine: discover log, pick the newest
    /// shard, acquire a cursor at `Latest`. The first real fetch
    /// happens next cycle.
    async fn establish_position(&self, source: &Source) -> IterationOutcome {
        let log = match self.log_reader.discover_latest_log(&source.table).await {
            Ok(Some(log)) => log,
            Ok(None) => {
                debug!(source = source.name(), table = source.table(), "waiting for log");
                return IterationOutcome::WaitingForLog;
            }
            Err(err) => return fault_outcome(source, "log discovery", &err),
        };

        let shard = match self.log_reader.open_shard(&log).await {
            Ok(Some(shard)) => shard,
            Ok(None) => {
                debug!(
                    source = source.name(),
                    log = log.as_str(),
                    "log has no shards yet"
                );
                return IterationOutcome::WaitingForLog;
            }
            Err(err) => return fault_outcome(source, "shard lookup", &err),
        };

        let cursor = match self
            .log_reader
            .acquire_cursor(&log, &shard, CursorPosition::Latest)
            .await
        {
            Ok(cursor) => cursor,
            Err(err) => return fault_outcome(source, "cursor acquisition", &err),
        };

        info!(
            source = source.name(),
            log = log.as_str(),
            shard = shard.as_str(),
            "position established, tailing future changes"
        );
        self.cursors
            .set(&source.name, CursorState::positioned(log, shard, cursor));
        IterationOutcome::Positioned
    }

    /// Dispatches a non-empty batch to the source's consumer. Consumer
    /// errors are caught here and never propagate into the loop.
    async fn deliver(&self, source: &Source, batch: Batch) -> IterationOutcome {
        if batch.is_empty() {
            return IterationOutcome::Empty;
        }

        let size = batch.len();
        match source.consumer.handle(&batch).await {
            Ok(()) => {
                info!(
                    source = source.name(),
                    consumer = source.consumer.name(),
                    batch_size = size,
                    "delivered batch"
                );
            }
            Err(err) => {
                warn!(
                    source = source.name(),
                    consumer = source.consumer.name(),
                    batch_size = size,
                    error = %err,
                    "consumer failed; batch dropped without rolling back the cursor"
                );
            }
        }
        IterationOutcome::Delivered(size)
    }
}

fn fault_outcome(source: &Source, stage: &str, err: &StreamError) -> IterationOutcome {
    if err.is_recoverable() {
        warn!(source = source.name(), stage = stage, error = %err, "recoverable stream fault");
        IterationOutcome::BackingOff
    } else {
        error!(source = source.name(), stage = stage, error = %err, "fatal stream fault");
        IterationOutcome::Fatal
    }
}

/// Handle over the spawned polling tasks.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stops scheduling further iterations and waits for in-flight
    /// ones to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

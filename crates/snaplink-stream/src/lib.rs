//! Local change-stream poller for the Snaplink URL shortener.
//!
//! This crate emulates a table's append-only change log when no native
//! streaming trigger is available. For each registered source it runs
//! one independent polling loop that reads the change log (or falls
//! back to full-table snapshots), reconciles a resumable cursor against
//! a log that can be trimmed or expired, normalizes the raw records
//! into canonical [`ChangeEvent`]s and hands them to the consumer bound
//! to that source.
//!
//! Delivery is at-least-once: a batch can be redelivered after cursor
//! recovery, so consumers must be idempotent.

pub mod backoff;
pub mod consumer;
pub mod cursor;
pub mod event;
pub mod normalize;
pub mod poller;
pub mod reader;
pub mod snapshot;

pub use backoff::Backoff;
pub use consumer::EventConsumer;
pub use cursor::{CursorState, CursorStore};
pub use event::{Batch, ChangeEvent, ChangeKind, RawChangeRecord};
pub use poller::{IngestMode, IterationOutcome, Poller, PollerHandle, Source};
pub use reader::{
    ChangeLogReader, Cursor, CursorPosition, FetchOutcome, LogId, ShardId, StreamError,
    StreamResult,
};
pub use snapshot::SnapshotReader;

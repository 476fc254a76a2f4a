use crate::event::RawChangeRecord;
use async_trait::async_trait;
use std::fmt::Display;
use thiserror::Error;

pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Handle of one change log, as issued by the log service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogId(String);

/// A partition of a log, read independently via its own cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardId(String);

/// An opaque, provider-issued token representing a read position
/// within a shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

macro_rules! opaque_token {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_token!(LogId);
opaque_token!(ShardId);
opaque_token!(Cursor);

/// Where to position a freshly acquired cursor within a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    /// Skip existing history; only future changes are visible.
    Latest,
    /// Replay from the oldest record the service still retains. Used
    /// for recovery after the log has been trimmed.
    EarliestRetained,
}

/// Result of one `fetch_next` call.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawChangeRecord>,
    /// `None` signals the shard is permanently closed; the caller must
    /// re-discover a new shard rather than retry this cursor.
    pub next_cursor: Option<Cursor>,
}

/// Classified change-log faults.
///
/// Absent logs and shards are expected transient states and are
/// modeled as `None` returns on the reader, never as errors.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The requested position precedes retained history. Recoverable
    /// by re-acquiring a cursor at `EarliestRetained`.
    #[error("cursor position precedes retained history: {0}")]
    Trimmed(String),
    /// The cursor aged out. Recoverable by full re-discovery, since
    /// the shard mapping itself may be stale.
    #[error("cursor has expired: {0}")]
    Expired(String),
    /// Network or throttling fault. Recoverable by backoff and retry
    /// with the same cursor.
    #[error("transient stream failure: {0}")]
    Transient(String),
    /// Misconfiguration or permission fault. Surfaced to the operator;
    /// the polling loop keeps running but will keep failing until the
    /// configuration changes.
    #[error("fatal stream misconfiguration: {0}")]
    Fatal(String),
}

impl StreamError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StreamError::Fatal(_))
    }
}

/// Client-side view of one change-log source.
#[async_trait]
pub trait ChangeLogReader: Send + Sync + 'static {
    /// Queries the service for the most recent log handle associated
    /// with a table. `None` means the table has no active log yet;
    /// callers treat it as "retry later", not as failure.
    async fn discover_latest_log(&self, table: &str) -> StreamResult<Option<LogId>>;

    /// Selects the newest shard of the log. `None` if the log
    /// currently has no shards.
    async fn open_shard(&self, log: &LogId) -> StreamResult<Option<ShardId>>;

    /// Obtains a cursor for a shard at the given position.
    async fn acquire_cursor(
        &self,
        log: &LogId,
        shard: &ShardId,
        position: CursorPosition,
    ) -> StreamResult<Cursor>;

    /// Fetches the next batch of change records for a cursor.
    async fn fetch_next(&self, cursor: &Cursor) -> StreamResult<FetchOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_is_not_recoverable() {
        assert!(StreamError::Trimmed("t".into()).is_recoverable());
        assert!(StreamError::Expired("e".into()).is_recoverable());
        assert!(StreamError::Transient("n".into()).is_recoverable());
        assert!(!StreamError::Fatal("bad credentials".into()).is_recoverable());
    }

    #[test]
    fn tokens_are_opaque_strings() {
        let cursor = Cursor::new("shard-0001/42");
        assert_eq!(cursor.as_str(), "shard-0001/42");
        assert_eq!(cursor.to_string(), "shard-0001/42");
    }
}

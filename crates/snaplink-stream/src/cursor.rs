use crate::reader::{Cursor, LogId, ShardId};
use dashmap::DashMap;

/// Per-source resumable read position.
///
/// A cursor is meaningless without its shard, so a token is only ever
/// observable together with its log and shard identifiers (see
/// [`CursorState::position`]). The all-null state forces full
/// re-discovery on the next poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorState {
    pub log: Option<LogId>,
    pub shard: Option<ShardId>,
    pub cursor: Option<Cursor>,
}

impl CursorState {
    /// A fully positioned state: log, shard and cursor all known.
    pub fn positioned(log: LogId, shard: ShardId, cursor: Cursor) -> Self {
        Self {
            log: Some(log),
            shard: Some(shard),
            cursor: Some(cursor),
        }
    }

    /// Returns the full read position, or `None` unless log, shard and
    /// cursor are all present.
    pub fn position(&self) -> Option<(&LogId, &ShardId, &Cursor)> {
        match (&self.log, &self.shard, &self.cursor) {
            (Some(log), Some(shard), Some(cursor)) => Some((log, shard, cursor)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_none() && self.shard.is_none() && self.cursor.is_none()
    }
}

/// In-memory per-source cursor state.
///
/// Ephemeral by design: rebuilt from the log service on first use and
/// after every invalidation. Each source's state is mutated exclusively
/// by that source's own polling loop.
#[derive(Debug, Default)]
pub struct CursorStore {
    states: DashMap<String, CursorState>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state for a source, all-null if the source
    /// was never initialized.
    pub fn get(&self, source: &str) -> CursorState {
        self.states
            .get(source)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Replaces the state for a source.
    pub fn set(&self, source: &str, state: CursorState) {
        self.states.insert(source.to_string(), state);
    }

    /// Clears the state to all-null, forcing re-discovery on the next
    /// poll.
    pub fn invalidate(&self, source: &str) {
        self.states.remove(source);
    }
}

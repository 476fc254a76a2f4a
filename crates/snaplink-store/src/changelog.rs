use dashmap::DashMap;
use snaplink_stream::{
    ChangeLogReader, Cursor, CursorPosition, FetchOutcome, LogId, RawChangeRecord, ShardId,
    StreamError, StreamResult,
};

/// Emulated change-log service: one append-only, shard-partitioned log
/// per table, with bounded retention.
///
/// Cursor tokens are opaque to callers but internally encode the
/// table, shard, offset and a generation counter; bumping the
/// generation invalidates every outstanding cursor, which emulates
/// provider-side cursor expiry.
#[derive(Debug, Default)]
pub struct MemoryChangeLog {
    logs: DashMap<String, TableLog>,
}

#[derive(Debug)]
struct TableLog {
    log_id: LogId,
    shards: Vec<ShardState>,
    generation: u64,
}

#[derive(Debug)]
struct ShardState {
    id: ShardId,
    records: Vec<RawChangeRecord>,
    /// Records before this offset are no longer retained.
    trimmed: usize,
    closed: bool,
}

impl TableLog {
    fn new(table: &str) -> Self {
        Self {
            log_id: LogId::new(format!("log-{table}")),
            shards: vec![ShardState::new(0)],
            generation: 0,
        }
    }

    fn newest_open_shard(&mut self) -> &mut ShardState {
        if self.shards.last().is_none_or(|s| s.closed) {
            let next = self.shards.len();
            self.shards.push(ShardState::new(next));
        }
        self.shards.last_mut().expect("shard list is never empty")
    }
}

impl ShardState {
    fn new(index: usize) -> Self {
        Self {
            id: ShardId::new(format!("shard-{index:04}")),
            records: vec![],
            trimmed: 0,
            closed: false,
        }
    }
}

impl MemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the log for a table if it does not exist yet. Appends
    /// do this implicitly; tests use it to control when discovery
    /// starts succeeding.
    pub fn create_log(&self, table: &str) {
        self.logs
            .entry(table.to_string())
            .or_insert_with(|| TableLog::new(table));
    }

    /// Appends one record to the newest open shard of the table's log,
    /// creating log and shard on demand.
    pub fn append(&self, table: &str, record: RawChangeRecord) {
        let mut log = self
            .logs
            .entry(table.to_string())
            .or_insert_with(|| TableLog::new(table));
        log.newest_open_shard().records.push(record);
    }

    /// Drops retained history so that only the last `keep` records of
    /// the newest shard remain readable. Outstanding cursors pointing
    /// before the new boundary will fail with `Trimmed`.
    pub fn trim(&self, table: &str, keep: usize) {
        if let Some(mut log) = self.logs.get_mut(table) {
            if let Some(shard) = log.shards.last_mut() {
                shard.trimmed = shard.records.len().saturating_sub(keep);
            }
        }
    }

    /// Permanently closes the newest shard; the next append rolls over
    /// to a fresh one.
    pub fn close_shard(&self, table: &str) {
        if let Some(mut log) = self.logs.get_mut(table) {
            if let Some(shard) = log.shards.last_mut() {
                shard.closed = true;
            }
        }
    }

    /// Invalidates every cursor issued so far for the table's log.
    pub fn expire_cursors(&self, table: &str) {
        if let Some(mut log) = self.logs.get_mut(table) {
            log.generation += 1;
        }
    }

    fn encode_cursor(table: &str, shard: &ShardId, offset: usize, generation: u64) -> Cursor {
        Cursor::new(format!("{table}|{}|{offset}|{generation}", shard.as_str()))
    }

    fn decode_cursor(cursor: &Cursor) -> StreamResult<(String, String, usize, u64)> {
        let mut parts = cursor.as_str().split('|');
        let (Some(table), Some(shard), Some(offset), Some(generation), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(StreamError::Fatal(format!(
                "malformed cursor token: {cursor}"
            )));
        };
        let offset = offset
            .parse()
            .map_err(|_| StreamError::Fatal(format!("malformed cursor offset: {cursor}")))?;
        let generation = generation
            .parse()
            .map_err(|_| StreamError::Fatal(format!("malformed cursor generation: {cursor}")))?;
        Ok((table.to_string(), shard.to_string(), offset, generation))
    }
}

#[async_trait::async_trait]
impl ChangeLogReader for MemoryChangeLog {
    async fn discover_latest_log(&self, table: &str) -> StreamResult<Option<LogId>> {
        Ok(self.logs.get(table).map(|log| log.log_id.clone()))
    }

    async fn open_shard(&self, log: &LogId) -> StreamResult<Option<ShardId>> {
        for entry in self.logs.iter() {
            if entry.log_id == *log {
                return Ok(entry.shards.last().map(|s| s.id.clone()));
            }
        }
        Ok(None)
    }

    async fn acquire_cursor(
        &self,
        log: &LogId,
        shard: &ShardId,
        position: CursorPosition,
    ) -> StreamResult<Cursor> {
        for entry in self.logs.iter() {
            if entry.log_id != *log {
                continue;
            }
            let Some(state) = entry.shards.iter().find(|s| s.id == *shard) else {
                return Err(StreamError::Expired(format!(
                    "shard {shard} no longer exists"
                )));
            };
            let offset = match position {
                CursorPosition::Latest => state.records.len(),
                CursorPosition::EarliestRetained => state.trimmed,
            };
            return Ok(Self::encode_cursor(
                entry.key(),
                shard,
                offset,
                entry.generation,
            ));
        }
        Err(StreamError::Expired(format!("log {log} no longer exists")))
    }

    async fn fetch_next(&self, cursor: &Cursor) -> StreamResult<FetchOutcome> {
        let (table, shard_id, offset, generation) = Self::decode_cursor(cursor)?;

        let Some(log) = self.logs.get(&table) else {
            return Err(StreamError::Expired(format!(
                "log for table {table} no longer exists"
            )));
        };
        if generation < log.generation {
            return Err(StreamError::Expired(format!(
                "cursor generation {generation} aged out"
            )));
        }
        let Some(shard) = log.shards.iter().find(|s| s.id.as_str() == shard_id) else {
            return Err(StreamError::Expired(format!(
                "shard {shard_id} no longer exists"
            )));
        };
        if offset < shard.trimmed {
            return Err(StreamError::Trimmed(format!(
                "offset {offset} precedes retained offset {}",
                shard.trimmed
            )));
        }

        let records: Vec<RawChangeRecord> = shard.records[offset.min(shard.records.len())..]
            .to_vec();
        let end = shard.records.len();

        // A closed, fully drained shard has no next cursor; the reader
        // must rediscover.
        let next_cursor = if shard.closed && offset + records.len() >= end && records.is_empty() {
            None
        } else {
            Some(Self::encode_cursor(&table, &shard.id, end, log.generation))
        };

        Ok(FetchOutcome {
            records,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snaplink_core::Attributes;
    use snaplink_stream::ChangeKind;

    fn record(key: &str) -> RawChangeRecord {
        let mut image = Attributes::new();
        image.insert("shortKey".into(), json!(key));
        RawChangeRecord {
            event_id: None,
            kind: Some(ChangeKind::Insert),
            new_image: image,
            approx_at: None,
        }
    }

    #[tokio::test]
    async fn discovery_returns_none_until_log_exists() {
        let log = MemoryChangeLog::new();
        assert!(log.discover_latest_log("urls").await.unwrap().is_none());

        log.create_log("urls");
        assert!(log.discover_latest_log("urls").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn latest_cursor_sees_only_future_records() {
        let log = MemoryChangeLog::new();
        log.append("urls", record("before"));

        let log_id = log.discover_latest_log("urls").await.unwrap().unwrap();
        let shard = log.open_shard(&log_id).await.unwrap().unwrap();
        let cursor = log
            .acquire_cursor(&log_id, &shard, CursorPosition::Latest)
            .await
            .unwrap();

        let outcome = log.fetch_next(&cursor).await.unwrap();
        assert!(outcome.records.is_empty());

        log.append("urls", record("after"));
        let outcome = log
            .fetch_next(&outcome.next_cursor.unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].new_image["shortKey"], "after");
    }

    #[tokio::test]
    async fn earliest_retained_replays_history() {
        let log = MemoryChangeLog::new();
        log.append("urls", record("a"));
        log.append("urls", record("b"));

        let log_id = log.discover_latest_log("urls").await.unwrap().unwrap();
        let shard = log.open_shard(&log_id).await.unwrap().unwrap();
        let cursor = log
            .acquire_cursor(&log_id, &shard, CursorPosition::EarliestRetained)
            .await
            .unwrap();

        let outcome = log.fetch_next(&cursor).await.unwrap();
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn trimmed_history_fails_stale_cursor() {
        let log = MemoryChangeLog::new();
        log.append("urls", record("a"));

        let log_id = log.discover_latest_log("urls").await.unwrap().unwrap();
        let shard = log.open_shard(&log_id).await.unwrap().unwrap();
        let stale = log
            .acquire_cursor(&log_id, &shard, CursorPosition::EarliestRetained)
            .await
            .unwrap();

        log.append("urls", record("b"));
        log.append("urls", record("c"));
        log.trim("urls", 1);

        let err = log.fetch_next(&stale).await.unwrap_err();
        assert!(matches!(err, StreamError::Trimmed(_)));

        // Recovery path: earliest retained now starts past the trim.
        let recovered = log
            .acquire_cursor(&log_id, &shard, CursorPosition::EarliestRetained)
            .await
            .unwrap();
        let outcome = log.fetch_next(&recovered).await.unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].new_image["shortKey"], "c");
    }

    #[tokio::test]
    async fn expired_generation_fails_all_cursors() {
        let log = MemoryChangeLog::new();
        log.append("urls", record("a"));

        let log_id = log.discover_latest_log("urls").await.unwrap().unwrap();
        let shard = log.open_shard(&log_id).await.unwrap().unwrap();
        let cursor = log
            .acquire_cursor(&log_id, &shard, CursorPosition::Latest)
            .await
            .unwrap();

        log.expire_cursors("urls");
        let err = log.fetch_next(&cursor).await.unwrap_err();
        assert!(matches!(err, StreamError::Expired(_)));
    }

    #[tokio::test]
    async fn closed_drained_shard_signals_end() {
        let log = MemoryChangeLog::new();
        log.append("urls", record("a"));

        let log_id = log.discover_latest_log("urls").await.unwrap().unwrap();
        let shard = log.open_shard(&log_id).await.unwrap().unwrap();
        let cursor = log
            .acquire_cursor(&log_id, &shard, CursorPosition::EarliestRetained)
            .await
            .unwrap();

        // Drain, then close.
        let outcome = log.fetch_next(&cursor).await.unwrap();
        assert_eq!(outcome.records.len(), 1);
        log.close_shard("urls");

        let outcome = log
            .fetch_next(&outcome.next_cursor.unwrap())
            .await
            .unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.next_cursor.is_none());

        // The next append rolls over to a fresh shard, discoverable
        // through the normal path.
        log.append("urls", record("b"));
        let rolled = log.open_shard(&log_id).await.unwrap().unwrap();
        assert_ne!(rolled, shard);
    }

    #[tokio::test]
    async fn malformed_cursor_is_fatal() {
        let log = MemoryChangeLog::new();
        log.create_log("urls");

        let err = log.fetch_next(&Cursor::new("garbage")).await.unwrap_err();
        assert!(matches!(err, StreamError::Fatal(_)));
    }
}

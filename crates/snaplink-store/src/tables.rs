use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use snaplink_core::error::Result;
use snaplink_core::{
    Attributes, ClickEvent, ClickEventStore, DailyStat, ShortKey, StatsStore, StoreError,
    UrlRecord, UrlStore,
};
use snaplink_stream::{ChangeKind, RawChangeRecord, SnapshotReader, StreamError, StreamResult};
use std::sync::Arc;

use crate::changelog::MemoryChangeLog;

pub const TABLE_URLS: &str = "urls";
pub const TABLE_CLICK_EVENTS: &str = "click_events";
pub const TABLE_DAILY_STATS: &str = "daily_stats";

/// In-memory implementation of the three Snaplink tables.
///
/// When a change log is attached, every mutation of the urls and
/// click-events tables is mirrored into it, which is what the stream
/// poller tails. The daily-stats table has no stream; it is only
/// written by the stats consumer and read by the stats endpoint.
#[derive(Debug, Default)]
pub struct MemoryTables {
    urls: DashMap<String, UrlRecord>,
    clicks: DashMap<String, ClickEvent>,
    stats: DashMap<(String, String), DailyStat>,
    changelog: Option<Arc<MemoryChangeLog>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates tables whose urls and click-events mutations feed the
    /// given change log.
    pub fn with_changelog(changelog: Arc<MemoryChangeLog>) -> Self {
        Self {
            changelog: Some(changelog),
            ..Self::default()
        }
    }

    fn emit(&self, table: &str, kind: ChangeKind, new_image: Attributes) {
        if let Some(changelog) = &self.changelog {
            changelog.append(
                table,
                RawChangeRecord {
                    event_id: None,
                    kind: Some(kind),
                    new_image,
                    approx_at: Some(Timestamp::now()),
                },
            );
        }
    }
}

#[async_trait]
impl UrlStore for MemoryTables {
    async fn insert_if_absent(&self, key: &ShortKey, record: UrlRecord) -> Result<()> {
        match self.urls.entry(key.as_str().to_string()) {
            dashmap::Entry::Occupied(_) => Err(StoreError::Conflict(key.to_string())),
            dashmap::Entry::Vacant(entry) => {
                let image = record.to_attributes(key);
                entry.insert(record);
                self.emit(TABLE_URLS, ChangeKind::Insert, image);
                Ok(())
            }
        }
    }

    async fn get(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        Ok(self.urls.get(key.as_str()).map(|r| r.clone()))
    }

    async fn increment_clicks(&self, key: &ShortKey) -> Result<()> {
        if let Some(mut record) = self.urls.get_mut(key.as_str()) {
            record.click_count += 1;
            let image = record.to_attributes(key);
            drop(record);
            self.emit(TABLE_URLS, ChangeKind::Modify, image);
        }
        Ok(())
    }

    async fn set_favicon_path(&self, key: &ShortKey, path: &str) -> Result<()> {
        if let Some(mut record) = self.urls.get_mut(key.as_str()) {
            record.favicon_path = Some(path.to_string());
            let image = record.to_attributes(key);
            drop(record);
            self.emit(TABLE_URLS, ChangeKind::Modify, image);
        }
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<(ShortKey, UrlRecord)>> {
        Ok(self
            .urls
            .iter()
            .map(|entry| (ShortKey::new_unchecked(entry.key().clone()), entry.clone()))
            .collect())
    }
}

#[async_trait]
impl ClickEventStore for MemoryTables {
    async fn append(&self, event: ClickEvent) -> Result<()> {
        let image = event.to_attributes();
        self.clicks.insert(event.event_id.clone(), event);
        self.emit(TABLE_CLICK_EVENTS, ChangeKind::Insert, image);
        Ok(())
    }

    async fn count_for(&self, key: &ShortKey) -> Result<u64> {
        Ok(self
            .clicks
            .iter()
            .filter(|entry| entry.short_key == *key)
            .count() as u64)
    }
}

#[async_trait]
impl StatsStore for MemoryTables {
    async fn increment_daily(&self, key: &ShortKey, stat_date: &str) -> Result<()> {
        self.stats
            .entry((key.as_str().to_string(), stat_date.to_string()))
            .and_modify(|stat| {
                stat.total_clicks += 1;
                stat.updated_at = Timestamp::now();
            })
            .or_insert_with(|| DailyStat {
                short_key: key.clone(),
                stat_date: stat_date.to_string(),
                total_clicks: 1,
                updated_at: Timestamp::now(),
            });
        Ok(())
    }

    async fn recent(&self, key: &ShortKey, limit: usize) -> Result<Vec<DailyStat>> {
        let mut stats: Vec<DailyStat> = self
            .stats
            .iter()
            .filter(|entry| entry.key().0 == key.as_str())
            .map(|entry| entry.clone())
            .collect();
        // Newest day first; the date format sorts lexicographically.
        stats.sort_by(|a, b| b.stat_date.cmp(&a.stat_date));
        stats.truncate(limit);
        Ok(stats)
    }
}

#[async_trait]
impl SnapshotReader for MemoryTables {
    async fn scan_table(&self, table: &str) -> StreamResult<Vec<Attributes>> {
        match table {
            TABLE_URLS => Ok(self
                .urls
                .iter()
                .map(|entry| entry.to_attributes(&ShortKey::new_unchecked(entry.key().clone())))
                .collect()),
            TABLE_CLICK_EVENTS => Ok(self.clicks.iter().map(|e| e.to_attributes()).collect()),
            other => Err(StreamError::Fatal(format!("unknown table: {other}"))),
        }
    }
}

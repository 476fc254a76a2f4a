use crate::error::Result;
use crate::record::{ClickEvent, DailyStat, UrlRecord};
use crate::shortkey::ShortKey;
use async_trait::async_trait;

/// The urls table collaborator.
///
/// Backends serialize their own writes; all methods are safe to call
/// concurrently from the gateway handlers and the stream consumers.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Inserts a new URL row. Returns `Err(Conflict)` if the key is already taken.
    async fn insert_if_absent(&self, key: &ShortKey, record: UrlRecord) -> Result<()>;

    /// Retrieves the URL row for a given short key.
    /// Returns `None` if the key does not exist.
    async fn get(&self, key: &ShortKey) -> Result<Option<UrlRecord>>;

    /// Increments the denormalized click counter for a key.
    /// A missing row is a no-op, not an error.
    async fn increment_clicks(&self, key: &ShortKey) -> Result<()>;

    /// Records the object-store path of the fetched favicon.
    async fn set_favicon_path(&self, key: &ShortKey, path: &str) -> Result<()>;

    /// Enumerates all current rows, in unspecified order.
    async fn scan(&self) -> Result<Vec<(ShortKey, UrlRecord)>>;
}

/// The click-events table collaborator.
#[async_trait]
pub trait ClickEventStore: Send + Sync + 'static {
    /// Appends one click event.
    async fn append(&self, event: ClickEvent) -> Result<()>;

    /// Counts recorded clicks for a key.
    async fn count_for(&self, key: &ShortKey) -> Result<u64>;
}

/// The daily-stats table collaborator.
#[async_trait]
pub trait StatsStore: Send + Sync + 'static {
    /// Adds one click to the `(key, stat_date)` bucket, creating it at
    /// zero when absent.
    async fn increment_daily(&self, key: &ShortKey, stat_date: &str) -> Result<()>;

    /// Returns up to `limit` daily buckets for a key, newest first.
    async fn recent(&self, key: &ShortKey, limit: usize) -> Result<Vec<DailyStat>>;
}

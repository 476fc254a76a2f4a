use crate::reader::StreamResult;
use async_trait::async_trait;
use snaplink_core::Attributes;

/// Fallback ingestion strategy: full enumeration of a table's current
/// rows, used when change-log emulation is disabled for the process.
///
/// Each scan is independent. There is no cursor, no ordering guarantee
/// and no delivery guarantee beyond "whatever exists at scan time".
/// Rows are synthesized into `Modify` events downstream, since a
/// snapshot cannot distinguish insert from update; consumers that act
/// only on `Insert` will therefore skip snapshot-sourced rows.
#[async_trait]
pub trait SnapshotReader: Send + Sync + 'static {
    async fn scan_table(&self, table: &str) -> StreamResult<Vec<Attributes>>;
}

use crate::event::ChangeEvent;
use async_trait::async_trait;

/// A downstream handler invoked with batches of normalized change
/// events.
///
/// Consumers perform idempotent external work and are expected to
/// catch and log their own per-record sub-failures. An error returned
/// from `handle` is caught at the dispatch boundary and logged with
/// the source name and batch size; it never breaks the polling loop
/// and never rolls back a cursor advance already committed
/// (at-least-once, not exactly-once).
#[async_trait]
pub trait EventConsumer: Send + Sync + 'static {
    /// Stable name used in log lines.
    fn name(&self) -> &str;

    /// Processes one batch. The batch is never empty.
    async fn handle(&self, batch: &[ChangeEvent]) -> anyhow::Result<()>;
}

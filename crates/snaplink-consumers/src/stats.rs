use async_trait::async_trait;
use jiff::tz::TimeZone;
use jiff::Timestamp;
use snaplink_core::{ShortKey, StatsStore};
use snaplink_stream::{ChangeEvent, ChangeKind, EventConsumer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Consumer bound to the click-events table.
///
/// Every inserted click is bucketed by UTC day and counted into the
/// daily-stats table.
pub struct StatsConsumer<S> {
    stats: Arc<S>,
}

impl<S: StatsStore> StatsConsumer<S> {
    pub fn new(stats: Arc<S>) -> Self {
        Self { stats }
    }

    async fn process(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        let Some(short_key) = event.new_image.get("shortKey").and_then(|v| v.as_str()) else {
            warn!(event_id = %event.event_id, "click event without shortKey, skipping");
            return Ok(());
        };
        let Some(clicked_at) = event.new_image.get("clickedAt").and_then(|v| v.as_i64()) else {
            warn!(short_key, "click event without clickedAt, skipping");
            return Ok(());
        };

        let key = ShortKey::new(short_key)?;
        let stat_date = stat_date(Timestamp::from_millisecond(clicked_at)?);
        self.stats.increment_daily(&key, &stat_date).await?;

        debug!(short_key, stat_date, "daily stat incremented");
        Ok(())
    }
}

/// UTC day bucket for a click timestamp, formatted `YYYY-MM-DD`.
fn stat_date(clicked_at: Timestamp) -> String {
    clicked_at
        .to_zoned(TimeZone::UTC)
        .strftime("%Y-%m-%d")
        .to_string()
}

#[async_trait]
impl<S: StatsStore> EventConsumer for StatsConsumer<S> {
    fn name(&self) -> &str {
        "process-stats"
    }

    async fn handle(&self, batch: &[ChangeEvent]) -> anyhow::Result<()> {
        for event in batch {
            if event.kind != ChangeKind::Insert {
                continue;
            }
            if let Err(err) = self.process(event).await {
                let short_key = event.new_image.get("shortKey").and_then(|v| v.as_str());
                warn!(short_key, error = %err, "failed to process click event");
            }
        }
        Ok(())
    }
}

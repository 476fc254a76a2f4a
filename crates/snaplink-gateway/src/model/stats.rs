use serde::Serialize;
use snaplink_core::DailyStat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub short_key: String,
    pub stats: Vec<DailyStatEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatEntry {
    pub stat_date: String,
    pub total_clicks: u64,
    /// Last update time, epoch milliseconds.
    pub updated_at: i64,
}

impl From<DailyStat> for DailyStatEntry {
    fn from(stat: DailyStat) -> Self {
        Self {
            stat_date: stat.stat_date,
            total_clicks: stat.total_clicks,
            updated_at: stat.updated_at.as_millisecond(),
        }
    }
}

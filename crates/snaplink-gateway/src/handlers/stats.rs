use crate::error::Result;
use crate::model::{DailyStatEntry, StatsResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use snaplink_core::{ShortKey, StatsStore};

const RECENT_DAYS: usize = 30;

pub async fn get_stats_handler(
    Path(short_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>> {
    let key = ShortKey::new(short_key)?;

    let stats = state
        .tables
        .recent(&key, RECENT_DAYS)
        .await?
        .into_iter()
        .map(DailyStatEntry::from)
        .collect();

    Ok(Json(StatsResponse {
        short_key: key.as_str().to_string(),
        stats,
    }))
}

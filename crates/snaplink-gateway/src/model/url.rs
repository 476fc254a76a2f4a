use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_key: String,
    pub short_url: String,
    pub long_url: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedUrl {
    pub short_key: String,
    pub long_url: String,
    pub total_clicks: u64,
    pub favicon: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

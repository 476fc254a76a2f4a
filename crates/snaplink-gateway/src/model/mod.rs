mod stats;
mod url;

pub use stats::{DailyStatEntry, StatsResponse};
pub use url::{HealthResponse, ListedUrl, ShortenRequest, ShortenResponse};

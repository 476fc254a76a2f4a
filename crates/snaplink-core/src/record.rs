use crate::shortkey::ShortKey;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An untyped row image, keyed by wire attribute name.
///
/// This is the shape rows take on the change stream and in snapshot
/// scans; the table stores produce it and the event normalizer
/// consumes it.
pub type Attributes = serde_json::Map<String, Value>;

/// A stored URL row in the urls table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub long_url: String,
    /// When the short URL was created.
    pub created_at: Timestamp,
    /// Denormalized click counter, incremented on every redirect.
    pub click_count: u64,
    /// Object-store path of the fetched favicon, once processed.
    pub favicon_path: Option<String>,
}

impl UrlRecord {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            created_at: Timestamp::now(),
            click_count: 0,
            favicon_path: None,
        }
    }

    /// Renders the row as wire attributes, including its key.
    pub fn to_attributes(&self, key: &ShortKey) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("shortKey".into(), Value::from(key.as_str()));
        attrs.insert("longUrl".into(), Value::from(self.long_url.as_str()));
        attrs.insert(
            "createdAt".into(),
            Value::from(self.created_at.as_millisecond()),
        );
        attrs.insert("clickCount".into(), Value::from(self.click_count));
        if let Some(path) = &self.favicon_path {
            attrs.insert("faviconPath".into(), Value::from(path.as_str()));
        }
        attrs
    }
}

/// A single click on a shortened URL, appended to the click-events table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub event_id: String,
    pub short_key: ShortKey,
    pub clicked_at: Timestamp,
    pub user_agent: String,
    pub ip_address: String,
}

impl ClickEvent {
    /// Renders the row as wire attributes.
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("eventId".into(), Value::from(self.event_id.as_str()));
        attrs.insert("shortKey".into(), Value::from(self.short_key.as_str()));
        attrs.insert(
            "clickedAt".into(),
            Value::from(self.clicked_at.as_millisecond()),
        );
        attrs.insert("userAgent".into(), Value::from(self.user_agent.as_str()));
        attrs.insert("ipAddress".into(), Value::from(self.ip_address.as_str()));
        attrs
    }
}

/// Aggregated clicks for one short key on one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub short_key: ShortKey,
    /// UTC day bucket, formatted `YYYY-MM-DD`.
    pub stat_date: String,
    pub total_clicks: u64,
    pub updated_at: Timestamp,
}

//! Converts provider-shaped change records and snapshot rows into the
//! canonical [`ChangeEvent`] shape consumed by every downstream
//! consumer.
//!
//! Normalization is tolerant: a missing change kind defaults to
//! `Modify` and a missing event identifier is synthesized from the
//! identifying key attribute. A record whose new-image lacks the key
//! attribute is skipped with a warning rather than failing the batch.

use crate::event::{Batch, ChangeEvent, ChangeKind, RawChangeRecord};
use jiff::Timestamp;
use serde_json::Value;
use snaplink_core::Attributes;
use tracing::warn;

/// Normalizes one raw log record. Returns `None` when the record lacks
/// the identifying key attribute in its new-image.
pub fn normalize_record(
    raw: RawChangeRecord,
    source: &str,
    key_attribute: &str,
) -> Option<ChangeEvent> {
    let key = identifying_key(&raw.new_image, source, key_attribute)?;

    Some(ChangeEvent {
        event_id: raw.event_id.unwrap_or(key),
        kind: raw.kind.unwrap_or(ChangeKind::Modify),
        new_image: raw.new_image,
        source: source.to_string(),
        approx_at: raw.approx_at.unwrap_or_else(Timestamp::now),
    })
}

/// Synthesizes a change event from a snapshot row.
///
/// Every row becomes a `Modify` event, even on a table's very first
/// population; a snapshot cannot distinguish insert from update.
pub fn normalize_row(row: Attributes, source: &str, key_attribute: &str) -> Option<ChangeEvent> {
    normalize_record(
        RawChangeRecord {
            event_id: None,
            kind: Some(ChangeKind::Modify),
            new_image: row,
            approx_at: None,
        },
        source,
        key_attribute,
    )
}

/// Normalizes a fetched batch of raw records, preserving log order.
pub fn log_batch(records: Vec<RawChangeRecord>, source: &str, key_attribute: &str) -> Batch {
    records
        .into_iter()
        .filter_map(|raw| normalize_record(raw, source, key_attribute))
        .collect()
}

/// Synthesizes a batch from a snapshot scan. Row-scan order, which is
/// unspecified, carries through.
pub fn snapshot_batch(rows: Vec<Attributes>, source: &str, key_attribute: &str) -> Batch {
    rows.into_iter()
        .filter_map(|row| normalize_row(row, source, key_attribute))
        .collect()
}

fn identifying_key(image: &Attributes, source: &str, key_attribute: &str) -> Option<String> {
    match image.get(key_attribute) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => {
            warn!(
                source = source,
                key_attribute = key_attribute,
                "skipping record without identifying key attribute"
            );
            None
        }
        Some(other) => Some(other.to_string()),
    }
}

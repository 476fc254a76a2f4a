use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snaplink_core::Attributes;

/// The kind of row mutation a change event describes.
///
/// `Remove` is defined for completeness; the shipped consumers only act
/// on `Insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

/// A canonical, normalized change event.
///
/// Events are transient: constructed per poll cycle, consumed
/// synchronously by the bound consumer, then discarded. The new-image
/// always contains at least the source's identifying key attribute
/// (records without it are dropped during normalization).
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub event_id: String,
    pub kind: ChangeKind,
    pub new_image: Attributes,
    /// Name of the source whose poll cycle produced this event.
    pub source: String,
    pub approx_at: Timestamp,
}

/// An ordered sequence of change events produced by one poll cycle for
/// one source. Ordering follows the log's order on the log path and is
/// unspecified on the snapshot path.
pub type Batch = Vec<ChangeEvent>;

/// A provider-shaped change record, prior to normalization.
///
/// All fields besides the new-image are optional; the normalizer fills
/// the gaps with tolerant defaults.
#[derive(Debug, Clone, Default)]
pub struct RawChangeRecord {
    pub event_id: Option<String>,
    pub kind: Option<ChangeKind>,
    pub new_image: Attributes,
    pub approx_at: Option<Timestamp>,
}

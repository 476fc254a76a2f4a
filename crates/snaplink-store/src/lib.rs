//! In-memory storage backends for Snaplink.
//!
//! Provides DashMap-backed implementations of the core table-store and
//! object-store traits, plus an emulated shard-partitioned change log
//! that the stream poller can tail the way it would a managed log
//! service (with trimming, shard closure and cursor expiry).

pub mod changelog;
pub mod objects;
pub mod tables;

pub use changelog::MemoryChangeLog;
pub use objects::{MemoryObjectStore, StoredObject};
pub use tables::{MemoryTables, TABLE_CLICK_EVENTS, TABLE_DAILY_STATS, TABLE_URLS};

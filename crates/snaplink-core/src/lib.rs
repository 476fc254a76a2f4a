//! Core types and traits for the Snaplink URL shortener.
//!
//! This crate provides the shared data model and the collaborator
//! traits (table store, object store) used by the gateway, the
//! shortener service and the change-stream consumers.

pub mod error;
pub mod object_store;
pub mod record;
pub mod shortkey;
pub mod store;

pub use error::{CoreError, ObjectStoreError, StoreError};
pub use object_store::ObjectStore;
pub use record::{Attributes, ClickEvent, DailyStat, UrlRecord};
pub use shortkey::ShortKey;
pub use store::{ClickEventStore, StatsStore, UrlStore};

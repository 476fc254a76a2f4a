//! Stream consumers for Snaplink: the favicon fetcher bound to the
//! urls table and the daily-stats aggregator bound to the click-events
//! table.

pub mod favicon;
pub mod stats;

pub use favicon::{FaviconConsumer, FaviconFetcher, HttpFaviconFetcher};
pub use stats::StatsConsumer;

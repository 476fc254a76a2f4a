mod health;
mod stats;
mod url;

pub use health::health_handler;
pub use stats::get_stats_handler;
pub use url::{list_urls_handler, redirect_handler, shorten_handler};

use snaplink_shortener::{RandomKeyGenerator, ShortenerService};
use snaplink_store::MemoryTables;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<ShortenerService<MemoryTables, RandomKeyGenerator>>,
    pub tables: Arc<MemoryTables>,
    pub base_url: String,
}

impl AppState {
    pub fn new(
        shortener: Arc<ShortenerService<MemoryTables, RandomKeyGenerator>>,
        tables: Arc<MemoryTables>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            tables,
            base_url: base_url.into(),
        }
    }
}

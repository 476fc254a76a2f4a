use async_trait::async_trait;
use snaplink_core::{ObjectStore, ShortKey, UrlStore};
use snaplink_stream::{ChangeEvent, ChangeKind, EventConsumer};
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches a site's favicon, abstracted for tests.
#[async_trait]
pub trait FaviconFetcher: Send + Sync + 'static {
    /// Returns the favicon bytes, or `None` if the site has none.
    async fn fetch(&self, favicon_url: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// `FaviconFetcher` backed by an HTTP client.
#[derive(Debug, Clone, Default)]
pub struct HttpFaviconFetcher {
    client: reqwest::Client,
}

impl HttpFaviconFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FaviconFetcher for HttpFaviconFetcher {
    async fn fetch(&self, favicon_url: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let response = self.client.get(favicon_url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }
}

/// Consumer bound to the urls table.
///
/// On every inserted row it fetches `/favicon.ico` from the long URL's
/// origin, stores the icon in the object store, and writes the object
/// path back onto the row. Re-delivery overwrites the same object and
/// path, so the work is idempotent.
pub struct FaviconConsumer<U, O, F> {
    urls: Arc<U>,
    objects: Arc<O>,
    fetcher: Arc<F>,
}

impl<U: UrlStore, O: ObjectStore, F: FaviconFetcher> FaviconConsumer<U, O, F> {
    pub fn new(urls: Arc<U>, objects: Arc<O>, fetcher: F) -> Self {
        Self {
            urls,
            objects,
            fetcher: Arc::new(fetcher),
        }
    }

    async fn process(&self, event: &ChangeEvent) -> anyhow::Result<()> {
        let Some(short_key) = event.new_image.get("shortKey").and_then(|v| v.as_str()) else {
            warn!(event_id = %event.event_id, "url row without shortKey, skipping");
            return Ok(());
        };
        let Some(long_url) = event.new_image.get("longUrl").and_then(|v| v.as_str()) else {
            warn!(short_key, "url row without longUrl, skipping");
            return Ok(());
        };
        let key = ShortKey::new(short_key)?;

        let favicon_url = reqwest::Url::parse(long_url)?.join("/favicon.ico")?;
        let Some(body) = self.fetcher.fetch(favicon_url.as_str()).await? else {
            warn!(short_key, %favicon_url, "favicon not found");
            return Ok(());
        };

        let object_key = format!("favicons/{short_key}.ico");
        self.objects
            .put_object(&object_key, body, "image/x-icon")
            .await?;
        self.urls.set_favicon_path(&key, &object_key).await?;

        info!(short_key, object_key, "favicon fetched and stored");
        Ok(())
    }
}

#[async_trait]
impl<U: UrlStore, O: ObjectStore, F: FaviconFetcher> EventConsumer for FaviconConsumer<U, O, F> {
    fn name(&self) -> &str {
        "process-favicon"
    }

    async fn handle(&self, batch: &[ChangeEvent]) -> anyhow::Result<()> {
        self.objects.ensure_bucket().await?;

        for event in batch {
            if event.kind != ChangeKind::Insert {
                continue;
            }
            // One bad row must not starve the rest of the batch.
            if let Err(err) = self.process(event).await {
                let short_key = event.new_image.get("shortKey").and_then(|v| v.as_str());
                warn!(short_key, error = %err, "failed to process favicon");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;
    use parking_lot::Mutex;
    use snaplink_core::UrlRecord;
    use snaplink_store::{MemoryObjectStore, MemoryTables};

    struct StubFetcher {
        body: Option<Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn returning(body: Option<Vec<u8>>) -> Self {
            Self {
                body,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FaviconFetcher for StubFetcher {
        async fn fetch(&self, favicon_url: &str) -> anyhow::Result<Option<Vec<u8>>> {
            self.requested.lock().push(favicon_url.to_string());
            Ok(self.body.clone())
        }
    }

    fn insert_event(short_key: &str, long_url: &str) -> ChangeEvent {
        let record = UrlRecord::new(long_url);
        ChangeEvent {
            event_id: short_key.to_string(),
            kind: ChangeKind::Insert,
            new_image: record.to_attributes(&ShortKey::new_unchecked(short_key)),
            source: "urls".to_string(),
            approx_at: Timestamp::now(),
        }
    }

    async fn seeded_tables(short_key: &str, long_url: &str) -> Arc<MemoryTables> {
        let tables = Arc::new(MemoryTables::new());
        tables
            .insert_if_absent(&ShortKey::new_unchecked(short_key), UrlRecord::new(long_url))
            .await
            .unwrap();
        tables
    }

    #[tokio::test]
    async fn insert_stores_icon_and_updates_the_row() {
        let tables = seeded_tables("abc123", "https://example.com/page").await;
        let objects = Arc::new(MemoryObjectStore::new());
        let consumer = FaviconConsumer::new(
            tables.clone(),
            objects.clone(),
            StubFetcher::returning(Some(vec![0xDE, 0xAD])),
        );

        let batch = vec![insert_event("abc123", "https://example.com/page")];
        consumer.handle(&batch).await.unwrap();

        let object = objects.get_object("favicons/abc123.ico").unwrap();
        assert_eq!(object.body, vec![0xDE, 0xAD]);
        assert_eq!(object.content_type, "image/x-icon");

        let record = tables
            .get(&ShortKey::new_unchecked("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.favicon_path.as_deref(), Some("favicons/abc123.ico"));
    }

    #[tokio::test]
    async fn favicon_url_is_resolved_against_the_origin() {
        let tables = seeded_tables("abc123", "https://example.com/deep/page?x=1").await;
        let objects = Arc::new(MemoryObjectStore::new());
        let fetcher = Arc::new(StubFetcher::returning(Some(vec![1])));
        let consumer = FaviconConsumer {
            urls: tables,
            objects,
            fetcher: fetcher.clone(),
        };

        let batch = vec![insert_event("abc123", "https://example.com/deep/page?x=1")];
        consumer.handle(&batch).await.unwrap();

        let requested = fetcher.requested.lock();
        assert_eq!(requested.as_slice(), ["https://example.com/favicon.ico"]);
    }

    #[tokio::test]
    async fn missing_favicon_leaves_the_row_untouched() {
        let tables = seeded_tables("abc123", "https://example.com").await;
        let objects = Arc::new(MemoryObjectStore::new());
        let consumer =
            FaviconConsumer::new(tables.clone(), objects.clone(), StubFetcher::returning(None));

        let batch = vec![insert_event("abc123", "https://example.com")];
        consumer.handle(&batch).await.unwrap();

        assert!(objects.is_empty());
        let record = tables
            .get(&ShortKey::new_unchecked("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.favicon_path, None);
    }

    #[tokio::test]
    async fn non_insert_events_are_ignored() {
        let tables = seeded_tables("abc123", "https://example.com").await;
        let objects = Arc::new(MemoryObjectStore::new());
        let consumer = FaviconConsumer::new(
            tables,
            objects.clone(),
            StubFetcher::returning(Some(vec![1])),
        );

        let mut event = insert_event("abc123", "https://example.com");
        event.kind = ChangeKind::Modify;
        consumer.handle(&[event]).await.unwrap();

        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn redelivery_converges_to_the_same_state() {
        let tables = seeded_tables("abc123", "https://example.com").await;
        let objects = Arc::new(MemoryObjectStore::new());
        let consumer = FaviconConsumer::new(
            tables.clone(),
            objects.clone(),
            StubFetcher::returning(Some(vec![7])),
        );

        let batch = vec![insert_event("abc123", "https://example.com")];
        consumer.handle(&batch).await.unwrap();
        consumer.handle(&batch).await.unwrap();

        assert_eq!(objects.len(), 1);
        let record = tables
            .get(&ShortKey::new_unchecked("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.favicon_path.as_deref(), Some("favicons/abc123.ico"));
    }
}

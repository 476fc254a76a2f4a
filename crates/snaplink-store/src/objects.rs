use async_trait::async_trait;
use dashmap::DashMap;
use snaplink_core::object_store::Result;
use snaplink_core::ObjectStore;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory object store, one implicit bucket.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    bucket_created: AtomicBool,
    objects: DashMap<String, StoredObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_object(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self) -> Result<()> {
        self.bucket_created.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_previous_version() {
        let store = MemoryObjectStore::new();
        store.ensure_bucket().await.unwrap();

        store
            .put_object("favicons/abc123.ico", vec![1, 2], "image/x-icon")
            .await
            .unwrap();
        store
            .put_object("favicons/abc123.ico", vec![3, 4], "image/x-icon")
            .await
            .unwrap();

        let object = store.get_object("favicons/abc123.ico").unwrap();
        assert_eq!(object.body, vec![3, 4]);
        assert_eq!(object.content_type, "image/x-icon");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let store = MemoryObjectStore::new();
        assert!(store.get_object("favicons/nope.ico").is_none());
        assert!(store.is_empty());
    }
}

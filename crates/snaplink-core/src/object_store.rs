use crate::error::ObjectStoreError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, ObjectStoreError>;

/// The object-store collaborator, consumed by the favicon consumer.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Creates the backing bucket if it does not exist yet. Idempotent.
    async fn ensure_bucket(&self) -> Result<()>;

    /// Writes an object, overwriting any previous version.
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

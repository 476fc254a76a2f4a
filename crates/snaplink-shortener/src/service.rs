use crate::error::{Result, ShortenerError};
use crate::generator::KeyGenerator;
use snaplink_core::{ShortKey, StoreError, UrlRecord, UrlStore};
use std::sync::Arc;

/// Attempt cap for the generate-then-conditionally-insert loop. A
/// collision means the generated key already exists; another draw is
/// almost certain to be free.
const MAX_KEY_ATTEMPTS: u32 = 5;

/// Shortening service over a urls table and a key generator.
///
/// Uniqueness comes from the table's conditional insert, not from the
/// generator: a conflicting draw is simply retried, up to
/// `MAX_KEY_ATTEMPTS` times.
#[derive(Debug, Clone)]
pub struct ShortenerService<U, G> {
    urls: Arc<U>,
    generator: Arc<G>,
}

impl<U: UrlStore, G: KeyGenerator> ShortenerService<U, G> {
    pub fn new(urls: Arc<U>, generator: G) -> Self {
        Self {
            urls,
            generator: Arc::new(generator),
        }
    }

    /// Shortens a URL and returns the key together with the stored row.
    pub async fn shorten(&self, long_url: &str) -> Result<(ShortKey, UrlRecord)> {
        validate_url(long_url)?;

        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = self.generator.generate();
            let record = UrlRecord::new(long_url);
            match self.urls.insert_if_absent(&key, record.clone()).await {
                Ok(()) => return Ok((key, record)),
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::KeySpaceExhausted(MAX_KEY_ATTEMPTS))
    }
}

/// Basic validation: the URL must carry an http(s) scheme and a host.
fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(ShortenerError::InvalidUrl("URL cannot be empty".into()));
    }

    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL must have a valid scheme and host: {url}"
        )));
    };
    if rest.is_empty() {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL must have a valid scheme and host: {url}"
        )));
    }

    let scheme = scheme.to_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL scheme must be http or https: {scheme}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SeqKeyGenerator;
    use snaplink_store::MemoryTables;

    fn test_service() -> ShortenerService<MemoryTables, SeqKeyGenerator> {
        ShortenerService::new(
            Arc::new(MemoryTables::new()),
            SeqKeyGenerator::with_prefix("sl"),
        )
    }

    #[tokio::test]
    async fn shorten_stores_the_record() {
        let service = test_service();

        let (key, record) = service.shorten("https://example.com").await.unwrap();
        assert_eq!(key.as_str(), "sl000000");
        assert_eq!(record.long_url, "https://example.com");
        assert_eq!(record.click_count, 0);

        let stored = service.urls.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.long_url, "https://example.com");
    }

    #[tokio::test]
    async fn shorten_rejects_invalid_urls() {
        let service = test_service();

        for url in ["", "not-a-url", "ftp://example.com", "https://"] {
            let err = service.shorten(url).await.unwrap_err();
            assert!(matches!(err, ShortenerError::InvalidUrl(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn collision_retries_until_a_free_key() {
        let tables = Arc::new(MemoryTables::new());
        let service = ShortenerService::new(tables.clone(), SeqKeyGenerator::with_prefix("sl"));

        // Occupy the first key the generator will draw.
        tables
            .insert_if_absent(
                &ShortKey::new_unchecked("sl000000"),
                UrlRecord::new("https://taken.example"),
            )
            .await
            .unwrap();

        let (key, _) = service.shorten("https://example.com").await.unwrap();
        assert_eq!(key.as_str(), "sl000001");
    }

    struct FixedKeyGenerator;

    impl KeyGenerator for FixedKeyGenerator {
        fn generate(&self) -> ShortKey {
            ShortKey::new_unchecked("always")
        }
    }

    #[tokio::test]
    async fn exhausted_key_space_is_reported() {
        let tables = Arc::new(MemoryTables::new());
        let service = ShortenerService::new(tables.clone(), FixedKeyGenerator);

        service.shorten("https://example.com").await.unwrap();
        let err = service.shorten("https://other.example").await.unwrap_err();
        assert!(matches!(err, ShortenerError::KeySpaceExhausted(5)));
    }
}

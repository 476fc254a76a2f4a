use rand::distributions::Alphanumeric;
use rand::Rng;
use snaplink_core::ShortKey;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for generating short keys.
///
/// Implementations are pure generators that don't interact with
/// storage; uniqueness is enforced by the conditional insert in the
/// shortener service.
pub trait KeyGenerator: Send + Sync + 'static {
    fn generate(&self) -> ShortKey;
}

/// Random alphanumeric key generator.
#[derive(Debug, Clone)]
pub struct RandomKeyGenerator {
    length: usize,
}

impl RandomKeyGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomKeyGenerator {
    fn default() -> Self {
        Self { length: 6 }
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> ShortKey {
        let key: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        ShortKey::new_unchecked(key)
    }
}

/// Deterministic sequential generator, used in tests.
#[derive(Debug)]
pub struct SeqKeyGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqKeyGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix: prefix.into(),
        }
    }
}

impl KeyGenerator for SeqKeyGenerator {
    fn generate(&self) -> ShortKey {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortKey::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}

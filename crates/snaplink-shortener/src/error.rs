use snaplink_core::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("failed to generate a unique short key after {0} attempts")]
    KeySpaceExhausted(u32),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

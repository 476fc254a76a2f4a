use thiserror::Error;

/// Errors related to the core data model.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short key: {0}")]
    InvalidShortKey(String),
}

/// Errors raised by table-store collaborators.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("short key already exists: {0}")]
    Conflict(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("stored row is invalid: {0}")]
    InvalidData(String),
}

/// Errors raised by object-store collaborators.
#[derive(Debug, Clone, Error)]
pub enum ObjectStoreError {
    #[error("bucket operation failed: {0}")]
    Bucket(String),
    #[error("object write failed: {0}")]
    Put(String),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

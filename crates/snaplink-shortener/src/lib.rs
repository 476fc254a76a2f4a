//! Shorten service for Snaplink: URL validation, short key generation
//! and conditional insertion into the urls table.

pub mod error;
pub mod generator;
pub mod service;

pub use error::ShortenerError;
pub use generator::{KeyGenerator, RandomKeyGenerator, SeqKeyGenerator};
pub use service::ShortenerService;

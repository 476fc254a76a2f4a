use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A validated short key identifier for a shortened URL.
///
/// Short keys must be 3-32 characters long and contain only
/// alphanumeric characters, hyphens, or underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortKey(String);

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;

impl ShortKey {
    /// Creates a new `ShortKey` after validating the input.
    ///
    /// Valid keys are 3-32 characters and contain only `[a-zA-Z0-9_-]`.
    pub fn new(key: impl Into<String>) -> std::result::Result<Self, CoreError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    /// Creates a `ShortKey` without validation.
    ///
    /// Use this only for keys produced by trusted internal sources
    /// (e.g. key generators that are guaranteed to produce valid output).
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(key: &str) -> std::result::Result<(), CoreError> {
        if key.len() < MIN_LENGTH || key.len() > MAX_LENGTH {
            return Err(CoreError::InvalidShortKey(format!(
                "length must be between {} and {}, got {}",
                MIN_LENGTH,
                MAX_LENGTH,
                key.len()
            )));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidShortKey(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                key
            )));
        }

        Ok(())
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

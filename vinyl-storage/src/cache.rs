//! Cache backend trait and its error type.
//!
//! The cache is a plain string store: callers own serialization and key
//! construction. A miss is reported as [`CacheError::Miss`] so that callers can
//! tell "not there" apart from "could not ask".

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Raw failures reported by a [`CacheBackend`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache miss for key {key}")]
    Miss { key: String },

    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn miss(key: impl Into<String>) -> Self {
        CacheError::Miss { key: key.into() }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss { .. })
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Pluggable key/value cache.
///
/// Implementations should be thread-safe and support concurrent access.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the payload stored under `key`.
    ///
    /// Returns [`CacheError::Miss`] when the key is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Round-trip to the backend to verify connectivity.
    async fn ping(&self) -> CacheResult<()>;
}

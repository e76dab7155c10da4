//! Page cache port.
//!
//! Values are rendered pages keyed by strings such as `index_page:anon:1`.
//! A backend that cannot be reached reads as a miss.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Cache: Send + Sync {
    /// Cached value for `key`, if present and not expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`. With a `ttl` the entry expires after that long.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Drop every entry this cache owns.
    async fn clear(&self) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend unreachable: {0}")]
    Unavailable(String),

    #[error("Cache command failed: {0}")]
    Command(String),
}

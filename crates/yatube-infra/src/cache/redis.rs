//! Redis page cache, shared by every server instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use yatube_core::ports::{Cache, CacheError};

/// Connection settings of the Redis page cache.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Namespace of this cache's keys. `clear` leaves other keys alone.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "yatube:".to_string(),
        }
    }
}

impl RedisConfig {
    /// Read `REDIS_URL`, `REDIS_CONNECT_TIMEOUT_SECS` and `REDIS_KEY_PREFIX`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout_secs = std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok());

        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connect_timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            key_prefix: std::env::var("REDIS_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }
}

fn command_failed(err: RedisError) -> CacheError {
    CacheError::Command(err.to_string())
}

/// Page cache stored in Redis. The connection manager reconnects on its own.
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCache {
    pub async fn connect(config: RedisConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Unavailable(format!("no answer from {}", config.url)))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        tracing::info!(url = %config.url, prefix = %config.key_prefix, "Connected to Redis page cache");

        Ok(Self {
            conn,
            prefix: config.key_prefix,
        })
    }

    pub async fn from_env() -> Result<Self, CacheError> {
        Self::connect(RedisConfig::from_env()).await
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Every key under this cache's prefix.
    async fn owned_keys(&self) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let mut iter = conn
            .scan_match::<_, String>(format!("{}*", self.prefix))
            .await
            .map_err(command_failed)?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(self.namespaced(key))
            .await
            .inspect_err(|e| tracing::warn!(key, error = %e, "Page cache read failed"))
            .ok()
            .flatten()
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        let stored = match ttl {
            // Redis expiry has second granularity
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await,
            None => conn.set::<_, _, ()>(key, value).await,
        };
        stored.map_err(command_failed)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.namespaced(key))
            .await
            .map_err(command_failed)
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(self.namespaced(key))
            .await
            .unwrap_or(false)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let keys = self.owned_keys().await?;
        if !keys.is_empty() {
            let mut conn = self.conn.clone();
            conn.del::<_, ()>(&keys).await.map_err(command_failed)?;
        }

        tracing::debug!(prefix = %self.prefix, removed = keys.len(), "Redis page cache cleared");
        Ok(())
    }
}

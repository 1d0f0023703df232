//! Redis cache backend.
//!
//! Uses `deadpool-redis` for connection pooling. Values are stored as plain
//! strings with `SET key value EX ttl`.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;

use crate::cache::{CacheBackend, CacheError, CacheResult};

/// [`CacheBackend`] backed by a Redis connection pool.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a pooled client from a `redis://` URL.
    pub fn from_url(url: &str, max_size: usize) -> CacheResult<Self> {
        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig::new(max_size));
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn get_conn(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

fn map_redis_error(err: redis::RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Backend(err.to_string())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(map_redis_error)?;
        value.ok_or_else(|| CacheError::miss(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.get_conn().await?;
        // Redis rejects EX 0.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(map_redis_error)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.get_conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

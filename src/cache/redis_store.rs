//! Redis cache backend

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use super::{CacheConfig, CacheEntry, CacheStore};
use crate::models::TeeTimeSlot;
use crate::utils::error::CacheError;

/// Redis cache client
pub struct RedisCache {
    /// Connection pool
    pool: Pool,
    /// Configuration
    config: CacheConfig,
}

impl RedisCache {
    /// Create a new cache instance and verify the connection
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let pool_config = PoolConfig::from_url(&config.url);
        let pool = pool_config
            .builder()
            .map_err(|e| CacheError::Unavailable(format!("Failed to create pool builder: {e}")))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Unavailable(format!("Failed to create Redis pool: {e}")))?;

        let cache = Self {
            pool,
            config: config.clone(),
        };

        cache.ping().await?;
        tracing::info!(url = %config.url, "Connected to Redis");

        Ok(cache)
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to get connection: {e}")))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to ping Redis: {e}")))?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!("Unexpected PING reply: {pong}")))
        }
    }

    /// Get config reference
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to get from cache: {e}")))?;

        let Some(bytes) = value else {
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes)?;

        // Redis expiry is second-granular and lazy; trust our own timestamp.
        if entry.is_expired() {
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn set(&self, key: &str, value: &[TeeTimeSlot], ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value.to_vec(), ttl);
        let bytes = serde_json::to_vec(&entry)?;

        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, bytes, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to set cache: {e}")))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Failed to delete key: {e}")))?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.ping().await.is_ok()
    }

    async fn close(&self) {
        self.pool.close();
        tracing::info!("Redis pool closed");
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

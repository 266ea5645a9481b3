//! Cache-aside storage for resolved tee times
//!
//! Entries are keyed `"<bookingSystem>:<courseId>:<date>"` and live for a
//! fixed TTL (900 seconds by default). Two backends implement [`CacheStore`]:
//!
//! - [`RedisCache`] - shared Redis via a deadpool connection pool
//! - [`MemoryCache`] - in-process map, for single-node runs and tests
//!
//! Both honour the same read contract: an entry whose `expires_at` has passed
//! is a miss, even if the backend has not physically removed it yet.
//!
//! There is no single-flight protection. Concurrent misses on one key may
//! each fetch upstream; the final `set` is last-writer-wins, which is
//! harmless because every writer stores a complete result.
//!
//! # Example
//!
//! ```rust,ignore
//! use fairway::cache::{RedisCache, CacheStore};
//! use fairway::config::Config;
//!
//! let cache = RedisCache::new(&Config::from_env()?.cache).await?;
//! cache.set("direct_api_a:pine:2026-10-18", &slots, Duration::from_secs(900)).await?;
//! let entry = cache.get("direct_api_a:pine:2026-10-18").await?;
//! ```

mod memory;
mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::config::env_override;
use crate::models::{BookingSystem, TeeTimeSlot};
use crate::utils::error::CacheError;

/// Default entry lifetime
pub const DEFAULT_TTL_SECS: u64 = 900;

/// Which backend holds cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown cache backend '{other}', expected 'redis' or 'memory'"
            )),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend selection
    pub backend: CacheBackend,

    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Entry TTL in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Override from environment variables. An unknown backend name is an
    /// error.
    pub fn apply_env(&mut self) -> crate::error::Result<()> {
        if let Ok(backend) = std::env::var("FAIRWAY_CACHE_BACKEND") {
            self.backend = backend.parse().map_err(crate::error::Error::config)?;
        }
        env_override("REDIS_URL", &mut self.url);
        env_override("REDIS_POOL_SIZE", &mut self.pool_size);
        env_override("FAIRWAY_CACHE_TTL", &mut self.ttl_secs);
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Build the cache key for a course on a date
pub fn cache_key(system: BookingSystem, course_id: &str, date: NaiveDate) -> String {
    format!("{}:{}:{}", system.as_str(), course_id, date.format("%Y-%m-%d"))
}

/// A cached resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<TeeTimeSlot>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// New entry written now
    pub fn new(key: impl Into<String>, value: Vec<TeeTimeSlot>, ttl: Duration) -> Self {
        let cached_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            key: key.into(),
            value,
            cached_at,
            expires_at: cached_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Expired entries must never be served
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds until expiry, zero once expired
    pub fn remaining_secs(&self) -> u64 {
        (self.expires_at - Utc::now()).num_seconds().max(0) as u64
    }
}

/// Key/value store with TTL, used cache-aside
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Live entry for `key`, or `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    async fn set(&self, key: &str, value: &[TeeTimeSlot], ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Whether the backend answers
    async fn health_check(&self) -> bool;

    /// Release backend connections
    async fn close(&self) {}

    /// Backend name for health output
    fn backend(&self) -> &'static str;
}

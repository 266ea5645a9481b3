//! In-process cache backend

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{CacheEntry, CacheStore};
use crate::models::TeeTimeSlot;
use crate::utils::error::CacheError;

/// HashMap-backed cache with lazy expiry. Expired entries are swept on
/// every write, so dated keys do not accumulate.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| !e.is_expired()).cloned())
    }

    async fn set(&self, key: &str, value: &[TeeTimeSlot], ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value.to_vec(), ttl);
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, existing| !existing.is_expired_at(now));
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn close(&self) {
        self.entries.write().await.clear();
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

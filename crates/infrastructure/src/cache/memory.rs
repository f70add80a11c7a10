//! In-process cache store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use elements_core::models::CachePolicy;
use elements_core::traits::{CacheStats, CacheStore};
use elements_core::ElementsResult;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// TTL-expiring map, used when no external cache is configured
///
/// Expired entries are dropped lazily on read, or in bulk by
/// [`purge_expired`](Self::purge_expired).
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    stats: Arc<RwLock<CacheStats>>,
    key_prefix: String,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ..Self::default()
        }
    }

    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    /// Number of stored entries, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove every expired entry and return how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }
        purged
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> ElementsResult<Option<Vec<u8>>> {
        let full_key = self.build_key(key);
        let now = Instant::now();

        let found = {
            let entries = self.entries.read().await;
            entries.get(&full_key).cloned()
        };

        let value = match found {
            Some(entry) if entry.is_expired(now) => {
                self.entries.write().await.remove(&full_key);
                None
            }
            Some(entry) => Some(entry.value),
            None => None,
        };

        let mut stats = self.stats.write().await;
        if value.is_some() {
            debug!("Cache HIT: {}", full_key);
            stats.hits += 1;
        } else {
            debug!("Cache MISS: {}", full_key);
            stats.misses += 1;
        }
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &[u8], policy: &CachePolicy) -> ElementsResult<()> {
        let full_key = self.build_key(key);
        let expires_at = policy.ttl_duration().map(|ttl| Instant::now() + ttl);
        debug!("Cache SET: {} with TTL: {}s", full_key, policy.ttl);

        self.entries.write().await.insert(
            full_key,
            CacheEntry {
                value: value.to_vec(),
                expires_at,
            },
        );
        self.stats.write().await.sets += 1;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> ElementsResult<bool> {
        let full_key = self.build_key(key);
        let removed = self.entries.write().await.remove(&full_key).is_some();
        if removed {
            self.stats.write().await.deletes += 1;
        }
        Ok(removed)
    }

    async fn get_stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{ElementsError, ElementsResult};
use crate::models::CachePolicy;
use crate::utils::canonicalize;

/// Prefix for keys produced by the default key derivation
pub const ELEMENT_KEY_PREFIX: &str = "element:";

/// Cache statistics and metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    pub fn error_rate(&self) -> f64 {
        let total_ops = self.hits + self.misses + self.sets + self.deletes;
        if total_ops == 0 {
            0.0
        } else {
            self.errors as f64 / total_ops as f64
        }
    }
}

/// Hash a JSON object into a stable key. Object keys are sorted recursively
/// before hashing, so insertion order never affects the result.
pub fn canonical_key(object: &Value) -> String {
    let canonical = canonicalize(object);
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{ELEMENT_KEY_PREFIX}{hex}")
}

/// Cache collaborator used by the dispatcher
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Derive a key from a composite JSON object
    fn key_from_object(&self, object: &Value) -> String {
        canonical_key(object)
    }

    /// Get a value from cache as raw bytes
    async fn get(&self, key: &str) -> ElementsResult<Option<Vec<u8>>>;

    /// Set a value, expiring it according to the policy TTL
    async fn set(&self, key: &str, value: &[u8], policy: &CachePolicy) -> ElementsResult<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> ElementsResult<bool>;

    /// Get cache statistics
    async fn get_stats(&self) -> CacheStats;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// Extension trait for convenient type-safe caching
#[async_trait]
pub trait CacheStoreExt: Send + Sync {
    async fn get_typed<T>(&self, key: &str) -> ElementsResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send + Sync;

    async fn set_typed<T>(&self, key: &str, value: &T, policy: &CachePolicy) -> ElementsResult<()>
    where
        T: serde::Serialize + Send + Sync;
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStoreExt for S {
    async fn get_typed<T>(&self, key: &str) -> ElementsResult<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send + Sync,
    {
        match self.get(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| ElementsError::Cache(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_typed<T>(&self, key: &str, value: &T, policy: &CachePolicy) -> ElementsResult<()>
    where
        T: serde::Serialize + Send + Sync,
    {
        let bytes = serde_json::to_vec(value).map_err(|e| ElementsError::Cache(e.to_string()))?;
        self.set(key, &bytes, policy).await
    }
}

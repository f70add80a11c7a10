//! Cache store construction from configuration

use std::sync::Arc;

use elements_core::config::{CacheBackend, CacheConfig};
use elements_core::traits::CacheStore;
use elements_core::{ElementsError, ElementsResult};
use tracing::info;

use super::{MemoryCacheStore, RedisCacheStore};

/// Build the configured cache store, or `None` when caching is disabled
pub async fn create_cache_store(config: &CacheConfig) -> ElementsResult<Option<Arc<dyn CacheStore>>> {
    if !config.enabled {
        info!("Cache is disabled, skipping initialization");
        return Ok(None);
    }

    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::with_prefix(config.key_prefix.clone())),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                ElementsError::configuration("redis_url is required for the redis cache backend")
            })?;
            Arc::new(RedisCacheStore::connect(url, config.key_prefix.clone()).await?)
        }
    };

    info!("Cache store initialized: {}", store.backend());
    Ok(Some(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_yields_none() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(create_cache_store(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let store = create_cache_store(&CacheConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_redis_backend_requires_url() {
        let config = CacheConfig {
            backend: CacheBackend::Redis,
            redis_url: None,
            ..CacheConfig::default()
        };
        let err = create_cache_store(&config).await.err().unwrap();
        assert!(matches!(err, ElementsError::Configuration(_)));
    }
}

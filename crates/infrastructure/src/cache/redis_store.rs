//! Redis cache store

use std::sync::Arc;

use async_trait::async_trait;
use elements_core::models::CachePolicy;
use elements_core::traits::{CacheStats, CacheStore};
use elements_core::{ElementsError, ElementsResult};
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

/// Redis-backed cache store sharing one connection manager
pub struct RedisCacheStore {
    connection: ConnectionManager,
    stats: Arc<RwLock<CacheStats>>,
    key_prefix: String,
}

impl RedisCacheStore {
    /// Connect and verify the server answers `PING`
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> ElementsResult<Self> {
        info!("Creating Redis cache store with URL: {}", redis_url);

        let client =
            redis::Client::open(redis_url).map_err(|e| ElementsError::Cache(e.to_string()))?;
        let mut connection = client
            .get_connection_manager()
            .await
            .map_err(|e| ElementsError::Cache(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| ElementsError::Cache(e.to_string()))?;

        info!("Redis cache store created successfully");

        Ok(Self {
            connection,
            stats: Arc::new(RwLock::new(CacheStats::default())),
            key_prefix: key_prefix.into(),
        })
    }

    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn record_error(&self, operation: &str, key: &str, err: redis::RedisError) -> ElementsError {
        error!("Cache {} failed for key {}: {}", operation, key, err);
        self.stats.write().await.errors += 1;
        ElementsError::Cache(err.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> ElementsResult<Option<Vec<u8>>> {
        let full_key = self.build_key(key);
        debug!("Cache GET: {}", full_key);

        let mut conn = self.connection.clone();
        let result: Option<Vec<u8>> = match redis::cmd("GET")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => return Err(self.record_error("GET", &full_key, e).await),
        };

        let mut stats = self.stats.write().await;
        match result {
            Some(value) => {
                debug!("Cache HIT: {}", full_key);
                stats.hits += 1;
                Ok(Some(value))
            }
            None => {
                debug!("Cache MISS: {}", full_key);
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &[u8], policy: &CachePolicy) -> ElementsResult<()> {
        let full_key = self.build_key(key);
        debug!("Cache SET: {} with TTL: {}s", full_key, policy.ttl);

        let mut conn = self.connection.clone();
        let command = if policy.ttl > 0 {
            let mut command = redis::cmd("SETEX");
            command.arg(&full_key).arg(policy.ttl).arg(value);
            command
        } else {
            let mut command = redis::cmd("SET");
            command.arg(&full_key).arg(value);
            command
        };

        let outcome: redis::RedisResult<()> = command.query_async(&mut conn).await;
        if let Err(e) = outcome {
            return Err(self.record_error("SET", &full_key, e).await);
        }

        self.stats.write().await.sets += 1;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> ElementsResult<bool> {
        let full_key = self.build_key(key);
        debug!("Cache DELETE: {}", full_key);

        let mut conn = self.connection.clone();
        let removed: i64 = match redis::cmd("DEL").arg(&full_key).query_async(&mut conn).await {
            Ok(count) => count,
            Err(e) => return Err(self.record_error("DELETE", &full_key, e).await),
        };

        if removed > 0 {
            self.stats.write().await.deletes += 1;
        }
        Ok(removed > 0)
    }

    async fn get_stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

//! Redis cache backend
//!
//! Production backend over a shared `ConnectionManager`. Pipelines are sent as
//! `MULTI/EXEC` so no reader sees a half-applied multi-key write. Redis does not
//! roll back a transaction when one command fails at execution time.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::info;

use crate::cache::backend::{CacheBackend, CacheCommand, Pipeline};
use crate::error::CacheError;

/// Configuration for the Redis backend
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Namespace prepended to every key as `{prefix}:{key}`
    pub key_prefix: Option<String>,
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis-backed `CacheBackend`.
///
/// The connection manager is cloned per call; clones share one multiplexed
/// connection and reconnect transparently.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

/// Redis TTLs are whole seconds; anything shorter rounds up to one.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl RedisCache {
    /// Connects to Redis, failing if the server is unreachable within the timeout.
    pub async fn connect(config: RedisCacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Unavailable(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(config.connection_timeout))?
            .map_err(|e| CacheError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;

        info!(url = %config.url, prefix = ?config.key_prefix, "Connected to Redis");
        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        match &self.config.key_prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::to_string)
                .unwrap_or(key),
            None => key,
        }
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            found.extend(keys);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(self.prefix_key(key)).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(self.prefix_key(key)).await?;
        Ok(exists)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.connection.clone();
        let hash: HashMap<String, String> = conn.hgetall(self.prefix_key(key)).await?;
        Ok(hash)
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection.clone();
        let items: Vec<String> = conn.lrange(self.prefix_key(key), start, stop).await?;
        Ok(items)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let keys = self.scan(&self.prefix_key(pattern)).await?;
        Ok(keys.into_iter().map(|key| self.strip_prefix(key)).collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let prefixed: Vec<String> = keys.iter().map(|key| self.prefix_key(key)).collect();
        let mut conn = self.connection.clone();
        let deleted: usize = conn.del(&prefixed).await?;
        Ok(deleted)
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<(), CacheError> {
        if pipeline.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();

        for command in pipeline.into_commands() {
            let key = self.prefix_key(command.key());
            match command {
                CacheCommand::Set { value, ttl, .. } => {
                    pipe.set_ex(key, value, ttl_secs(ttl)).ignore();
                }
                CacheCommand::Delete { .. } => {
                    pipe.del(key).ignore();
                }
                CacheCommand::HashSet { fields, .. } => {
                    if !fields.is_empty() {
                        pipe.hset_multiple(key, &fields).ignore();
                    }
                }
                CacheCommand::ListPush { value, .. } => {
                    pipe.lpush(key, value).ignore();
                }
                CacheCommand::ListTrim { start, stop, .. } => {
                    pipe.ltrim(key, start, stop).ignore();
                }
                CacheCommand::ListRemove { value, .. } => {
                    pipe.lrem(key, 0, value).ignore();
                }
                CacheCommand::Expire { ttl, .. } => {
                    pipe.expire(key, ttl_secs(ttl) as i64).ignore();
                }
            }
        }

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn size(&self) -> Result<usize, CacheError> {
        match &self.config.key_prefix {
            Some(_) => Ok(self.scan(&self.prefix_key("*")).await?.len()),
            None => {
                let mut conn = self.connection.clone();
                let size: usize = redis::cmd("DBSIZE").query_async(&mut conn).await?;
                Ok(size)
            }
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running Redis instance:
    // cargo test -- --ignored

    async fn test_cache() -> RedisCache {
        RedisCache::connect(RedisCacheConfig::new("redis://127.0.0.1:6379").with_key_prefix("catalog-test"))
            .await
            .unwrap()
    }

    #[test]
    fn test_ttl_rounds_up_to_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(86_400)), 86_400);
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_pipeline_and_reads() {
        let cache = test_cache().await;
        let mut pipe = Pipeline::new();
        pipe.set("product:T1", "{}", Duration::from_secs(60))
            .list_push("products:recent", "T1")
            .list_trim("products:recent", 0, 99)
            .hash_set("cart:t1", vec![("item_count".into(), "0".into())]);
        cache.execute(pipe).await.unwrap();

        assert_eq!(cache.get("product:T1").await.unwrap(), Some("{}".to_string()));
        assert_eq!(cache.list_range("products:recent", 0, 0).await.unwrap(), vec!["T1"]);
        assert_eq!(cache.keys("cart:t1").await.unwrap(), vec!["cart:t1"]);

        let removed = cache
            .delete(&["product:T1".into(), "products:recent".into(), "cart:t1".into()])
            .await
            .unwrap();
        assert_eq!(removed, 3);
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_ping() {
        test_cache().await.ping().await.unwrap();
    }
}

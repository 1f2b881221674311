//! Redis key-value store implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::{CacheError, KeyValueStore};

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisStoreConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis-backed `KeyValueStore`.
///
/// Uses `ConnectionManager` for pooling/reconnects, SET EX for per-key
/// expiry and SCAN for prefix enumeration. Connection-class failures map to
/// `StoreUnavailable` so the orchestrator can degrade to volatile-only.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisKeyValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisKeyValueStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

fn map_redis_error(context: &str, error: redis::RedisError) -> CacheError {
    if error.is_io_error() || error.is_timeout() || error.is_connection_refusal() {
        CacheError::store_unavailable(format!("{}: {}", context, error))
    } else {
        CacheError::store(format!("{}: {}", context, error))
    }
}

impl RedisKeyValueStore {
    /// Creates a new Redis store connection
    pub async fn new(config: RedisStoreConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::store(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| CacheError::store_unavailable("Timed out connecting to Redis"))?
        .map_err(|e| map_redis_error("Failed to connect to Redis", e))?;

        Ok(Self { connection, config })
    }

    /// Creates a Redis store with default configuration
    pub async fn with_url(url: impl Into<String>) -> Result<Self, CacheError> {
        Self::new(RedisStoreConfig::new(url)).await
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| map_redis_error(&format!("Failed to get key '{}'", key), e))?;

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| map_redis_error(&format!("Failed to set key '{}'", key), e))?;

        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(keys)
            .await
            .map_err(|e| map_redis_error("Failed to delete keys", e))?;

        Ok(deleted as usize)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", prefix);

        // SCAN rather than KEYS so large instances are not blocked
        let mut cursor = 0u64;
        let mut keys = Vec::new();

        loop {
            let (new_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    map_redis_error(&format!("Failed to scan keys with prefix '{}'", prefix), e)
                })?;

            keys.extend(batch);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }
}

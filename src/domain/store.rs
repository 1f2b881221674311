//! Durable key-value store boundary

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::CacheError;

/// Network-addressable expiring key-value store.
///
/// Values are JSON strings so the trait stays dyn-compatible. Implementations
/// must return `CacheError::StoreUnavailable` for connection-level failures
/// (refused, timed out, broken transport) and `CacheError::Store` for
/// request-level ones, so callers can tell an outage from a bad request.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Gets the value at a key, if present and not expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Sets a value with a per-key TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Deletes the given keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError>;

    /// Lists all keys starting with the given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

//! Durable cache tier over a key-value store

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::{CacheEntry, CacheError, KeyValueStore};

/// Durable tier adapter.
///
/// Maps every entry onto two key families under the configured namespace:
/// `{ns}:exact:{hash}` for O(1) exact lookups and `{ns}:semantic:{hash}`,
/// enumerable by prefix for similarity scans. Every write sets both keys and
/// every delete removes both. Each store call is bounded by the configured
/// timeout; an elapsed timeout is reported as `StoreUnavailable`, the same
/// as an unreachable store.
#[derive(Debug, Clone)]
pub struct DurableStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    timeout: Duration,
}

impl DurableStore {
    /// Create an adapter over the given store
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            timeout,
        }
    }

    fn exact_key(&self, hash: &str) -> String {
        format!("{}:exact:{}", self.namespace, hash)
    }

    fn semantic_key(&self, hash: &str) -> String {
        format!("{}:semantic:{}", self.namespace, hash)
    }

    fn semantic_prefix(&self) -> String {
        format!("{}:semantic:", self.namespace)
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| CacheError::store_unavailable("durable store call timed out"))?
    }

    fn decode(&self, key: &str, raw: &str) -> Result<CacheEntry, CacheError> {
        serde_json::from_str(raw)
            .map_err(|e| CacheError::malformed_entry(format!("key '{}': {}", key, e)))
    }

    /// Get a live entry by prompt hash
    pub async fn get(&self, hash: &str) -> Result<Option<CacheEntry>, CacheError> {
        let key = self.exact_key(hash);

        let raw = match self.bounded(self.store.get(&key)).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let entry = match self.decode(&key, &raw) {
            Ok(entry) => entry,
            Err(error) => {
                warn!("Skipping malformed durable entry: {}", error);
                return Ok(None);
            }
        };

        Ok(Some(entry).filter(|entry| !entry.is_expired()))
    }

    /// Write an entry to both key families, TTL-aligned with its expiry
    pub async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let ttl = entry
            .ttl_remaining()
            .unwrap_or_else(|| Duration::from_secs(1));
        let payload = serde_json::to_string(entry)
            .map_err(|e| CacheError::internal(format!("Failed to serialize entry: {}", e)))?;

        let hash = entry.prompt_hash();
        let exact = self.exact_key(hash);
        let semantic = self.semantic_key(hash);

        self.bounded(async {
            let (exact_result, semantic_result) = futures::join!(
                self.store.set(&exact, &payload, ttl),
                self.store.set(&semantic, &payload, ttl),
            );
            exact_result.and(semantic_result)
        })
        .await
    }

    /// Remove both keys for a hash, returning whether either existed
    pub async fn delete(&self, hash: &str) -> Result<bool, CacheError> {
        let keys = vec![self.exact_key(hash), self.semantic_key(hash)];
        let deleted = self.bounded(self.store.delete(&keys)).await?;

        Ok(deleted > 0)
    }

    /// All live entries in the semantic family, skipping malformed records
    pub async fn list_live(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let keys = self.bounded(self.store.list_keys(&self.semantic_prefix())).await?;
        let mut entries = Vec::with_capacity(keys.len());

        for key in keys {
            let raw = match self.bounded(self.store.get(&key)).await? {
                Some(raw) => raw,
                None => continue,
            };

            match self.decode(&key, &raw) {
                Ok(entry) if !entry.is_expired() => entries.push(entry),
                Ok(_) => {}
                Err(error) => warn!("Skipping malformed durable entry: {}", error),
            }
        }

        Ok(entries)
    }

    /// Number of entries in the semantic family
    pub async fn count(&self) -> Result<usize, CacheError> {
        let keys = self.bounded(self.store.list_keys(&self.semantic_prefix())).await?;

        Ok(keys.len())
    }

    /// Remove every key under the namespace, returning the entry count
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let semantic = self
            .bounded(self.store.list_keys(&self.semantic_prefix()))
            .await?;
        let entry_count = semantic.len();

        let all = self
            .bounded(self.store.list_keys(&format!("{}:", self.namespace)))
            .await?;
        self.bounded(self.store.delete(&all)).await?;

        Ok(entry_count)
    }

    /// Persist an updated copy of an entry (hit-count bumps), keeping TTL
    pub async fn update(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        self.put(entry).await
    }
}

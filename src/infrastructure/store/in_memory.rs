//! In-memory key-value store implementation

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::{CacheError, KeyValueStore};

/// In-memory `KeyValueStore` with per-key expiry.
///
/// Suitable for development, single-process deployments and tests. The
/// `set_unavailable` switch makes every call fail with `StoreUnavailable`,
/// which is how degradation paths are exercised without a network.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
}

impl InMemoryKeyValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the simulated outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::store_unavailable("simulated outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_available()?;

        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check_available()?;

        let deadline = Instant::now() + ttl;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), deadline));

        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        self.check_available()?;

        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();

        Ok(keys
            .iter()
            .filter(|key| {
                entries
                    .remove(*key)
                    .is_some_and(|(_, deadline)| deadline > now)
            })
            .count())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.check_available()?;

        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries.retain(|_, (_, deadline)| *deadline > now);

        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

//! Process-local volatile cache tier

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::CacheEntry;

/// In-memory mirror of cache entries, keyed by prompt hash.
///
/// Fastest path and the fallback when the durable tier is unreachable.
/// Lost on restart, rebuilt empty. Expired entries are treated as absent
/// and lazily purged on access. All methods are synchronous, so no lock is
/// ever held across an await point.
#[derive(Debug, Default)]
pub struct VolatileCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl VolatileCache {
    /// Create an empty volatile tier
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live entry by prompt hash
    pub fn get(&self, hash: &str) -> Option<CacheEntry> {
        {
            let entries = self.entries.read().unwrap();

            match entries.get(hash) {
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Lazy purge of the expired entry
        self.entries.write().unwrap().remove(hash);

        None
    }

    /// Insert or replace the entry for its prompt hash
    pub fn put(&self, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap()
            .insert(entry.prompt_hash().to_string(), entry);
    }

    /// Remove an entry, returning whether it existed and was live
    pub fn delete(&self, hash: &str) -> bool {
        self.entries
            .write()
            .unwrap()
            .remove(hash)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Snapshot of all live entries, purging expired ones on the way
    pub fn list_live(&self) -> Vec<CacheEntry> {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, entry| !entry.is_expired());
        entries.values().cloned().collect()
    }

    /// Number of live entries
    pub fn len_live(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    /// Bump the hit count of a stored entry, returning the updated copy
    pub fn increment_hit(&self, hash: &str) -> Option<CacheEntry> {
        let mut entries = self.entries.write().unwrap();

        let entry = entries.get_mut(hash).filter(|entry| !entry.is_expired())?;
        entry.increment_hits();

        Some(entry.clone())
    }

    /// Drop every entry, returning how many were live
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap();
        let live = entries.values().filter(|entry| !entry.is_expired()).count();
        entries.clear();

        live
    }
}

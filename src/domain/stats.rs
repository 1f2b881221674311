//! Cache statistics and accounting

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of cache counters.
///
/// `total_entries` is a gauge recomputed from the live-entry count; the rest
/// are process-lifetime monotonic counters, reset only by `clear()`.
/// Tokens/cost saved are length-derived estimates, not metered usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total lookup calls served
    pub total_requests: u64,
    /// Lookups that returned a cached response
    pub cache_hits: u64,
    /// Lookups that returned nothing
    pub cache_misses: u64,
    /// Live entries currently visible
    pub total_entries: usize,
    /// Estimated tokens not re-generated thanks to hits
    pub tokens_saved: u64,
    /// Estimated spend avoided, in the configured cost unit
    pub estimated_cost_saved: f64,
}

impl CacheStats {
    /// Fraction of requests served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;

        if total == 0 {
            return 0.0;
        }

        self.cache_hits as f64 / total as f64
    }
}

/// Rough token estimate for a cached response (4 chars per token)
pub fn estimate_tokens(response: &str) -> u64 {
    (response.len() / 4) as u64
}

/// Shared counter state behind the service
#[derive(Debug)]
pub struct StatsCollector {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    tokens_saved: AtomicU64,
    cost_saved: RwLock<f64>,
    cost_per_token: f64,
}

impl StatsCollector {
    /// Create a collector with the given per-token cost estimate
    pub fn new(cost_per_token: f64) -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            tokens_saved: AtomicU64::new(0),
            cost_saved: RwLock::new(0.0),
            cost_per_token,
        }
    }

    /// Count one lookup call
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a hit and accumulate the estimated savings for `response`
    pub fn record_hit(&self, response: &str) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);

        let tokens = estimate_tokens(response);
        self.tokens_saved.fetch_add(tokens, Ordering::Relaxed);

        let mut cost = self.cost_saved.write().unwrap();
        *cost += tokens as f64 * self.cost_per_token;
    }

    /// Count a miss
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters with the current live-entry gauge
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            total_entries,
            tokens_saved: self.tokens_saved.load(Ordering::Relaxed),
            estimated_cost_saved: *self.cost_saved.read().unwrap(),
        }
    }

    /// Reset every counter to zero
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.tokens_saved.store(0, Ordering::Relaxed);
        *self.cost_saved.write().unwrap() = 0.0;
    }
}

//! Semantic cache service
//!
//! Orchestrates the embedding provider, the durable tier and the volatile
//! mirror behind a small fail-open contract: environmental failures are
//! absorbed into miss/degrade behavior and never surface to callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::{
    CacheEntry, CacheError, CacheHit, CacheStats, KeyValueStore, SearchParams, StatsCollector,
    best_match, prompt_hash,
};
use crate::infrastructure::durable::DurableStore;
use crate::infrastructure::volatile::VolatileCache;

/// Options for storing a response
#[derive(Debug, Clone)]
pub struct SetOptions {
    /// Upstream provider that produced the response
    pub provider: String,
    /// Upstream model that produced the response
    pub model: String,
    /// Entry lifetime override; the configured default applies when unset
    pub ttl: Option<Duration>,
    /// Caller-supplied context stored with the entry
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SetOptions {
    /// Create options for a provider/model pair
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ttl: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Override the entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Semantic response cache.
///
/// Two-tier: a durable key-value store shared across processes (the
/// authoritative copy when reachable) mirrored by a process-local volatile
/// map (fastest path, outage fallback). Lookups try the exact-match path
/// (prompt-hash, no embedding call) before the similarity scan.
#[derive(Debug)]
pub struct SemanticCacheService {
    config: CacheConfig,
    embedding: Arc<dyn EmbeddingProvider>,
    durable: DurableStore,
    volatile: VolatileCache,
    stats: StatsCollector,
    store_degraded: AtomicBool,
    closed: AtomicBool,
}

impl SemanticCacheService {
    /// Validate the configuration and wire up the tiers.
    ///
    /// Dependencies are injected; the service owns no global state.
    pub fn open(
        config: CacheConfig,
        embedding: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let durable = DurableStore::new(store, config.namespace.clone(), config.store_timeout());
        let stats = StatsCollector::new(config.cost_per_token);

        Ok(Self {
            config,
            embedding,
            durable,
            volatile: VolatileCache::new(),
            stats,
            store_degraded: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Release the volatile mirror and stop serving.
    ///
    /// Subsequent lookups miss and writes are dropped; the durable
    /// connection is released when the injected store is dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.volatile.clear();
        debug!("Semantic cache closed");
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get the configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Exact-match lookup by normalized prompt. No embedding call is made.
    pub async fn get_exact(&self, prompt: &str) -> Result<Option<CacheHit>, CacheError> {
        if self.is_closed() {
            return Ok(None);
        }

        self.stats.record_request();

        let hash = prompt_hash(prompt);

        match self.lookup_exact(&hash).await {
            Some(entry) => {
                debug!("Exact cache hit for {}", &hash[..12]);
                Ok(Some(self.register_hit(entry, 1.0).await))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Similarity lookup with the configured default threshold
    pub async fn get_similar(&self, prompt: &str) -> Result<Option<CacheHit>, CacheError> {
        self.get_similar_with(prompt, SearchParams::new(self.config.default_threshold))
            .await
    }

    /// Similarity lookup with explicit parameters.
    ///
    /// Tries the exact path first; embeds only on an exact miss. A threshold
    /// outside [0, 1] is a programming error and the one condition surfaced
    /// to the caller.
    pub async fn get_similar_with(
        &self,
        prompt: &str,
        params: SearchParams,
    ) -> Result<Option<CacheHit>, CacheError> {
        if !(0.0..=1.0).contains(&params.threshold) {
            return Err(CacheError::configuration(format!(
                "similarity threshold must be within [0, 1], got {}",
                params.threshold
            )));
        }

        if self.is_closed() {
            return Ok(None);
        }

        self.stats.record_request();

        let hash = prompt_hash(prompt);

        if let Some(entry) = self.lookup_exact(&hash).await {
            debug!("Exact cache hit for {}", &hash[..12]);
            return Ok(Some(self.register_hit(entry, 1.0).await));
        }

        let query = match self.generate_embedding(prompt).await {
            Ok(vector) => vector,
            Err(error) => {
                warn!("Failed to generate embedding for cache lookup: {}", error);
                self.stats.record_miss();
                return Ok(None);
            }
        };

        let candidates = self.candidate_entries().await;

        let matched = best_match(&query, candidates.iter(), &params)
            .map(|(entry, similarity)| (entry.clone(), similarity));

        match matched {
            Some((entry, similarity)) => {
                debug!(
                    "Semantic cache hit with similarity {:.4} for {}",
                    similarity,
                    &entry.prompt_hash()[..12]
                );
                Ok(Some(self.register_hit(entry, similarity).await))
            }
            None => {
                debug!(
                    "Semantic cache miss for prompt: {}...",
                    prompt.chars().take(50).collect::<String>()
                );
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Cache a response under the prompt's identity.
    ///
    /// Returns false only when the embedding step fails; durable-tier
    /// failures are absorbed and the volatile write alone counts as success.
    pub async fn set(
        &self,
        prompt: &str,
        response: &str,
        options: SetOptions,
    ) -> Result<bool, CacheError> {
        if self.is_closed() {
            return Ok(false);
        }

        let embedding = match self.generate_embedding(prompt).await {
            Ok(vector) => vector,
            Err(error) => {
                warn!("Failed to generate embedding for caching: {}", error);
                return Ok(false);
            }
        };

        let ttl = options.ttl.unwrap_or_else(|| self.config.default_ttl());
        let entry = CacheEntry::new(
            prompt,
            embedding,
            response,
            options.provider,
            options.model,
            ttl,
        )
        .with_metadata(options.metadata);

        self.volatile.put(entry.clone());

        match self.durable.put(&entry).await {
            Ok(()) => self.note_store_recovery(),
            Err(error) => self.note_store_failure(&error),
        }

        debug!("Cached response for {}", &entry.prompt_hash()[..12]);

        Ok(true)
    }

    /// Remove the entry for a prompt from both tiers
    pub async fn invalidate(&self, prompt: &str) -> Result<bool, CacheError> {
        if self.is_closed() {
            return Ok(false);
        }

        let hash = prompt_hash(prompt);
        let volatile_found = self.volatile.delete(&hash);

        let durable_found = match self.durable.delete(&hash).await {
            Ok(found) => {
                self.note_store_recovery();
                found
            }
            Err(error) => {
                self.note_store_failure(&error);
                false
            }
        };

        Ok(volatile_found || durable_found)
    }

    /// Remove every live entry whose prompt contains the substring,
    /// case-insensitively, across both tiers. Returns the distinct count.
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        if self.is_closed() {
            return Ok(0);
        }

        let needle = pattern.to_lowercase();
        let mut hashes = std::collections::HashSet::new();

        for entry in self.volatile.list_live() {
            if entry.prompt().to_lowercase().contains(&needle) {
                hashes.insert(entry.prompt_hash().to_string());
            }
        }

        match self.durable.list_live().await {
            Ok(entries) => {
                self.note_store_recovery();
                for entry in entries {
                    if entry.prompt().to_lowercase().contains(&needle) {
                        hashes.insert(entry.prompt_hash().to_string());
                    }
                }
            }
            Err(error) => self.note_store_failure(&error),
        }

        for hash in &hashes {
            self.volatile.delete(hash);

            if let Err(error) = self.durable.delete(hash).await {
                self.note_store_failure(&error);
            }
        }

        debug!("Invalidated {} entries matching '{}'", hashes.len(), pattern);

        Ok(hashes.len())
    }

    /// Remove every entry from both tiers and reset statistics.
    /// Returns the distinct count of live entries removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        if self.is_closed() {
            return Ok(0);
        }

        let mut hashes = std::collections::HashSet::new();

        for entry in self.volatile.list_live() {
            hashes.insert(entry.prompt_hash().to_string());
        }

        match self.durable.list_live().await {
            Ok(entries) => {
                self.note_store_recovery();
                for entry in entries {
                    hashes.insert(entry.prompt_hash().to_string());
                }
            }
            Err(error) => self.note_store_failure(&error),
        }

        self.volatile.clear();

        if let Err(error) = self.durable.clear().await {
            self.note_store_failure(&error);
        }

        self.stats.reset();

        info!("Semantic cache cleared, {} entries removed", hashes.len());

        Ok(hashes.len())
    }

    /// Snapshot of the counters. Never fails; the entry gauge falls back to
    /// the volatile tier when the durable tier is unreachable.
    pub async fn stats(&self) -> CacheStats {
        let total_entries = match self.durable.count().await {
            Ok(count) => {
                self.note_store_recovery();
                count
            }
            Err(error) => {
                self.note_store_failure(&error);
                self.volatile.len_live()
            }
        };

        self.stats.snapshot(total_entries)
    }

    /// Durable lookup first (authoritative), volatile on miss or outage
    async fn lookup_exact(&self, hash: &str) -> Option<CacheEntry> {
        match self.durable.get(hash).await {
            Ok(Some(entry)) => {
                self.note_store_recovery();
                Some(entry)
            }
            Ok(None) => {
                self.note_store_recovery();
                self.volatile.get(hash)
            }
            Err(error) => {
                self.note_store_failure(&error);
                self.volatile.get(hash)
            }
        }
    }

    /// Candidate set for the similarity scan: durable when reachable,
    /// volatile otherwise
    async fn candidate_entries(&self) -> Vec<CacheEntry> {
        match self.durable.list_live().await {
            Ok(entries) => {
                self.note_store_recovery();
                entries
            }
            Err(error) => {
                self.note_store_failure(&error);
                self.volatile.list_live()
            }
        }
    }

    /// Bump the hit count, mirror the entry volatile-side, persist the bump
    /// best-effort, and account the savings
    async fn register_hit(&self, mut entry: CacheEntry, similarity: f32) -> CacheHit {
        entry.increment_hits();
        self.volatile.put(entry.clone());

        if let Err(error) = self.durable.update(&entry).await {
            self.note_store_failure(&error);
        }

        self.stats.record_hit(entry.response());

        CacheHit::new(entry, similarity)
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, CacheError> {
        let request = EmbeddingRequest::single(&self.config.embedding_model, text);

        let response = tokio::time::timeout(self.config.embed_timeout(), self.embedding.embed(request))
            .await
            .map_err(|_| CacheError::embedding("embedding call timed out"))??;

        response
            .first()
            .map(|e| e.vector().to_vec())
            .ok_or_else(|| CacheError::embedding("no embedding returned"))
    }

    /// Log an outage once; request-level store errors are logged each time
    fn note_store_failure(&self, error: &CacheError) {
        if error.is_unavailable() {
            if !self.store_degraded.swap(true, Ordering::SeqCst) {
                warn!("Durable store degraded, serving volatile tier only: {}", error);
            }
        } else {
            warn!("Durable store error: {}", error);
        }
    }

    fn note_store_recovery(&self) {
        if self.store_degraded.swap(false, Ordering::SeqCst) {
            info!("Durable store reachable again");
        }
    }

    #[cfg(test)]
    pub(crate) async fn seed_entry(&self, entry: CacheEntry) {
        self.volatile.put(entry.clone());
        let _ = self.durable.put(&entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::infrastructure::store::InMemoryKeyValueStore;
    use chrono::Utc;

    const DIMS: usize = 8;

    fn test_config() -> CacheConfig {
        CacheConfig::new()
            .with_embedding_model("mock-embedding")
            .with_embedding_dimensions(DIMS)
            .with_namespace("test")
    }

    fn create_service() -> (Arc<InMemoryKeyValueStore>, SemanticCacheService) {
        create_service_with(MockEmbeddingProvider::new("mock", DIMS), test_config())
    }

    fn create_service_with(
        provider: MockEmbeddingProvider,
        config: CacheConfig,
    ) -> (Arc<InMemoryKeyValueStore>, SemanticCacheService) {
        let backend = Arc::new(InMemoryKeyValueStore::new());
        let service =
            SemanticCacheService::open(config, Arc::new(provider), backend.clone()).unwrap();

        (backend, service)
    }

    fn options() -> SetOptions {
        SetOptions::new("openai", "gpt-4")
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (_, service) = create_service();

        assert!(service.set("What is Rust?", "a language", options()).await.unwrap());

        let hit = service.get_exact("What is Rust?").await.unwrap().unwrap();

        assert_eq!(hit.entry.response(), "a language");
        assert!((hit.similarity - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_exact_match_normalizes_prompt() {
        let (_, service) = create_service();

        service.set("Hello World", "resp", options()).await.unwrap();

        let hit = service.get_exact("  hello world  ").await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_idempotent_overwrite() {
        let (_, service) = create_service();

        service.set("prompt", "first", options()).await.unwrap();
        service.set("prompt", "second", options()).await.unwrap();

        let hit = service.get_exact("prompt").await.unwrap().unwrap();
        assert_eq!(hit.entry.response(), "second");

        let stats = service.stats().await;
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_absent() {
        let (_, service) = create_service();

        let expired = CacheEntry::new(
            "stale prompt",
            vec![1.0; DIMS],
            "stale",
            "openai",
            "gpt-4",
            Duration::from_secs(3600),
        )
        .with_expires_at(Utc::now() - chrono::Duration::seconds(5));
        service.seed_entry(expired).await;

        assert!(service.get_exact("stale prompt").await.unwrap().is_none());
        assert!(service.get_similar("stale prompt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_similar_hit_via_exact_fast_path() {
        let (_, service) = create_service();

        service.set("same prompt", "resp", options()).await.unwrap();

        let hit = service.get_similar("same prompt").await.unwrap().unwrap();

        assert!((hit.similarity - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_semantic_hit_for_paraphrase() {
        let provider = MockEmbeddingProvider::new("mock", 2)
            .with_vector("original phrasing", vec![1.0, 0.0])
            .with_vector("reworded phrasing", vec![0.999, 0.01]);
        let config = test_config().with_embedding_dimensions(2);
        let (_, service) = create_service_with(provider, config);

        service
            .set("original phrasing", "cached answer", options())
            .await
            .unwrap();

        let hit = service
            .get_similar("reworded phrasing")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.entry.response(), "cached answer");
        assert!(hit.similarity >= 0.95 && hit.similarity < 1.0);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive_at_service_level() {
        let stored = vec![1.0, 1.0];
        let query = vec![1.0, 0.0];
        let exact_similarity = crate::domain::cosine_similarity(&query, &stored);

        let provider = MockEmbeddingProvider::new("mock", 2)
            .with_vector("stored", stored)
            .with_vector("query", query);
        let config = test_config().with_embedding_dimensions(2);
        let (_, service) = create_service_with(provider, config);

        service.set("stored", "resp", options()).await.unwrap();

        // Exactly at the threshold: hit
        let hit = service
            .get_similar_with("query", SearchParams::new(exact_similarity))
            .await
            .unwrap();
        assert!(hit.is_some());

        // Strictly above the similarity: miss
        let miss = service
            .get_similar_with("query", SearchParams::new(exact_similarity + 0.0001))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_dimension_isolation() {
        let provider = MockEmbeddingProvider::new("mock", 2).with_vector("query", vec![1.0, 0.0]);
        let config = test_config().with_embedding_dimensions(2);
        let (_, service) = create_service_with(provider, config);

        // An entry embedded at a different dimension
        let foreign = CacheEntry::new(
            "older entry",
            vec![1.0, 0.0, 0.0],
            "resp",
            "openai",
            "gpt-4",
            Duration::from_secs(3600),
        );
        service.seed_entry(foreign).await;

        let result = service
            .get_similar_with("query", SearchParams::new(0.0))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_provider_model_filters() {
        let provider = MockEmbeddingProvider::new("mock", 2)
            .with_vector("prompt a", vec![1.0, 0.0])
            .with_vector("prompt b", vec![1.0, 0.001]);
        let config = test_config().with_embedding_dimensions(2);
        let (_, service) = create_service_with(provider, config);

        service
            .set("prompt a", "resp", SetOptions::new("openai", "gpt-4"))
            .await
            .unwrap();

        let matching = SearchParams::new(0.9).with_provider("openai").with_model("gpt-4");
        assert!(
            service
                .get_similar_with("prompt b", matching)
                .await
                .unwrap()
                .is_some()
        );

        let wrong = SearchParams::new(0.9).with_model("claude-3");
        assert!(
            service
                .get_similar_with("prompt b", wrong)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_invalid_threshold_surfaces() {
        let (_, service) = create_service();

        let result = service
            .get_similar_with("prompt", SearchParams::new(1.5))
            .await;

        assert!(matches!(
            result,
            Err(CacheError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_a_recorded_miss() {
        let provider = MockEmbeddingProvider::new("mock", DIMS).with_error("quota exceeded");
        let (_, service) = create_service_with(provider, test_config());

        let result = service.get_similar("prompt").await.unwrap();
        assert!(result.is_none());

        let stats = service.stats().await;
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_makes_set_return_false() {
        let provider = MockEmbeddingProvider::new("mock", DIMS).with_error("quota exceeded");
        let (_, service) = create_service_with(provider, test_config());

        assert!(!service.set("prompt", "resp", options()).await.unwrap());
    }

    #[tokio::test]
    async fn test_embedding_timeout_is_a_miss() {
        let provider =
            MockEmbeddingProvider::new("mock", DIMS).with_delay(Duration::from_millis(100));
        let config = test_config().with_embed_timeout(Duration::from_millis(1));
        let (_, service) = create_service_with(provider, config);

        let result = service.get_similar("prompt").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_set_succeeds_during_store_outage() {
        let (backend, service) = create_service();
        backend.set_unavailable(true);

        assert!(service.set("prompt", "resp", options()).await.unwrap());

        // Served from the volatile tier while degraded
        let hit = service.get_exact("prompt").await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn test_durable_hit_mirrors_into_volatile() {
        let (backend, service) = create_service();

        service.set("prompt", "resp", options()).await.unwrap();

        // A second service instance sharing the durable store (fresh volatile)
        let service2 = SemanticCacheService::open(
            test_config(),
            Arc::new(MockEmbeddingProvider::new("mock", DIMS)),
            backend.clone(),
        )
        .unwrap();

        assert!(service2.get_exact("prompt").await.unwrap().is_some());

        // Now reachable from the volatile mirror even with the store down
        backend.set_unavailable(true);
        assert!(service2.get_exact("prompt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hit_count_increments() {
        let (_, service) = create_service();

        service.set("prompt", "resp", options()).await.unwrap();

        let first = service.get_exact("prompt").await.unwrap().unwrap();
        let second = service.get_exact("prompt").await.unwrap().unwrap();

        assert_eq!(first.entry.hit_count(), 1);
        assert_eq!(second.entry.hit_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (_, service) = create_service();

        service.set("prompt", "resp", options()).await.unwrap();

        assert!(service.invalidate("prompt").await.unwrap());
        assert!(!service.invalidate("prompt").await.unwrap());
        assert!(service.get_exact("prompt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_by_pattern() {
        let (_, service) = create_service();

        service.set("Acme pricing", "r1", options()).await.unwrap();
        service.set("Acme support", "r2", options()).await.unwrap();
        service.set("Globex pricing", "r3", options()).await.unwrap();

        let removed = service.invalidate_by_pattern("acme").await.unwrap();

        assert_eq!(removed, 2);
        assert!(service.get_exact("Acme pricing").await.unwrap().is_none());
        assert!(service.get_exact("Acme support").await.unwrap().is_none());
        assert!(service.get_exact("Globex pricing").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cold_cache_scenario() {
        let (_, service) = create_service();

        let result = service.get_similar("anything").await.unwrap();
        assert!(result.is_none());

        let stats = service.stats().await;
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 0);
    }

    #[tokio::test]
    async fn test_clear_resets_scenario() {
        let (_, service) = create_service();

        for i in 0..5 {
            service
                .set(&format!("prompt {}", i), "resp", options())
                .await
                .unwrap();
        }
        let _ = service.get_exact("prompt 0").await.unwrap();

        let removed = service.clear().await.unwrap();
        assert_eq!(removed, 5);

        let stats = service.stats().await;
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
        assert_eq!(stats.tokens_saved, 0);
        assert_eq!(stats.estimated_cost_saved, 0.0);
    }

    #[tokio::test]
    async fn test_stats_accounting() {
        let config = test_config().with_cost_per_token(0.001);
        let (_, service) = create_service_with(MockEmbeddingProvider::new("mock", DIMS), config);

        // 400-char response -> 100 estimated tokens
        service
            .set("prompt", &"x".repeat(400), options())
            .await
            .unwrap();
        let _ = service.get_exact("prompt").await.unwrap();

        let stats = service.stats().await;
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.tokens_saved, 100);
        assert!((stats.estimated_cost_saved - 0.1).abs() < 1e-9);
        assert!((stats.hit_rate() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_isolation() {
        let (_, service) = create_service();
        let service = Arc::new(service);

        let mut handles = Vec::new();

        for i in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .set(&format!("prompt-{}", i), &format!("resp-{}", i), options())
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let mut handles = Vec::new();

        for i in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let hit = service
                    .get_exact(&format!("prompt-{}", i))
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(hit.entry.response(), format!("resp-{}", i));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let stats = service.stats().await;
        assert_eq!(stats.total_entries, 16);
        assert_eq!(stats.cache_hits, 16);
    }

    #[tokio::test]
    async fn test_closed_service_is_inert() {
        let (_, service) = create_service();

        service.set("prompt", "resp", options()).await.unwrap();
        service.close();

        assert!(service.is_closed());
        assert!(service.get_exact("prompt").await.unwrap().is_none());
        assert!(!service.set("other", "resp", options()).await.unwrap());
        assert_eq!(service.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let backend = Arc::new(InMemoryKeyValueStore::new());
        let config = test_config().with_threshold(2.0);

        let result = SemanticCacheService::open(
            config,
            Arc::new(MockEmbeddingProvider::new("mock", DIMS)),
            backend,
        );

        assert!(matches!(
            result,
            Err(CacheError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_durable_record_skipped_in_scan() {
        let provider = MockEmbeddingProvider::new("mock", 2)
            .with_vector("stored", vec![1.0, 0.0])
            .with_vector("query", vec![1.0, 0.0]);
        let config = test_config().with_embedding_dimensions(2);
        let (backend, service) = create_service_with(provider, config);

        service.set("stored", "resp", options()).await.unwrap();
        backend
            .set("test:semantic:deadbeef", "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        let hit = service.get_similar("query").await.unwrap();

        assert!(hit.is_some());
    }
}

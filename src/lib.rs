//! LLM Semantic Cache
//!
//! A similarity-keyed response cache for expensive generative calls:
//! - Exact-match fast path (normalized-prompt hash, no embedding call)
//! - Semantic-match path (cosine similarity over stored embeddings)
//! - Two tiers: a durable key-value store shared across processes and a
//!   process-local volatile mirror, with fail-soft degradation
//! - TTL lifecycle, invalidation and savings accounting
//!
//! Environmental failures (embedding provider, durable store) never surface
//! to callers; from the outside the only outcomes are "got a cached result"
//! or "did not".
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use llm_semantic_cache::{
//!     CacheConfig, HttpClient, OpenAiEmbeddingProvider, RedisKeyValueStore,
//!     SemanticCacheService, SetOptions,
//! };
//!
//! # async fn example() -> Result<(), llm_semantic_cache::CacheError> {
//! let store = Arc::new(RedisKeyValueStore::with_url("redis://127.0.0.1:6379").await?);
//! let provider = Arc::new(OpenAiEmbeddingProvider::new(
//!     HttpClient::with_timeout(Duration::from_secs(10)),
//!     std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//! ));
//!
//! let cache = SemanticCacheService::open(CacheConfig::default(), provider, store)?;
//!
//! cache
//!     .set("What is Rust?", "A systems language.", SetOptions::new("openai", "gpt-4"))
//!     .await?;
//!
//! if let Some(hit) = cache.get_similar("what's rust?").await? {
//!     println!("cached ({}): {}", hit.similarity, hit.entry.response());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::CacheConfig;
pub use domain::{
    CacheEntry, CacheError, CacheHit, CacheStats, KeyValueStore, SearchParams,
    embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse},
};
pub use infrastructure::{
    SemanticCacheService, SetOptions,
    embedding::{HttpClient, HttpClientTrait, OpenAiEmbeddingProvider},
    store::{InMemoryKeyValueStore, RedisKeyValueStore, RedisStoreConfig},
};

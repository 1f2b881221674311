//! Cache entry model and prompt identity

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Normalize a prompt for identity purposes: trimmed and case-folded.
///
/// Two prompts with equal normalized forms share a cache slot.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.trim().to_lowercase()
}

/// Deterministic hash of the normalized prompt, hex-encoded SHA-256.
pub fn prompt_hash(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_prompt(prompt).as_bytes());
    hex::encode(hasher.finalize())
}

/// A cached LLM response keyed by prompt identity and embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The original prompt text
    prompt: String,
    /// Hash of the normalized prompt (exact-match identity)
    prompt_hash: String,
    /// Embedding vector for similarity search
    embedding: Vec<f32>,
    /// The cached response payload (opaque to the cache)
    response: String,
    /// Upstream provider that produced the response
    provider: String,
    /// Upstream model that produced the response
    model: String,
    /// When this entry was created
    created_at: DateTime<Utc>,
    /// When this entry expires
    expires_at: DateTime<Utc>,
    /// Number of times this entry was served
    hit_count: u32,
    /// Caller-supplied context, never interpreted
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl CacheEntry {
    /// Create a new entry expiring `ttl` from now.
    ///
    /// The TTL is clamped to at least one second so `expires_at` is always
    /// strictly after `created_at`.
    pub fn new(
        prompt: impl Into<String>,
        embedding: Vec<f32>,
        response: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let prompt = prompt.into();
        let hash = prompt_hash(&prompt);
        let now = Utc::now();
        let ttl_secs = ttl.as_secs().max(1);

        Self {
            prompt,
            prompt_hash: hash,
            embedding,
            response: response.into(),
            provider: provider.into(),
            model: model.into(),
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_secs as i64),
            hit_count: 0,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach caller-supplied metadata
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Get the original prompt text
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Get the normalized-prompt hash
    pub fn prompt_hash(&self) -> &str {
        &self.prompt_hash
    }

    /// Get the embedding vector
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Get the embedding dimension
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    /// Get the cached response payload
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Get the upstream provider label
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Get the upstream model label
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the expiry timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Get the hit count
    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    /// Get the metadata map
    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    /// Remaining lifetime, or `None` if already expired
    pub fn ttl_remaining(&self) -> Option<Duration> {
        let remaining = self.expires_at - Utc::now();
        remaining.to_std().ok().filter(|d| !d.is_zero())
    }

    /// Whether this entry is past its expiry and logically absent
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Record one successful retrieval of this entry
    pub fn increment_hits(&mut self) {
        self.hit_count = self.hit_count.saturating_add(1);
    }
}

/// A successful cache lookup: the entry plus the similarity that matched it.
///
/// Exact-path hits report a similarity of 1.0.
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// The matching entry
    pub entry: CacheEntry,
    /// Similarity score that produced the match
    pub similarity: f32,
}

impl CacheHit {
    /// Create a new hit
    pub fn new(entry: CacheEntry, similarity: f32) -> Self {
        Self { entry, similarity }
    }

    /// Create an exact-match hit (similarity 1.0)
    pub fn exact(entry: CacheEntry) -> Self {
        Self::new(entry, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_entry(prompt: &str) -> CacheEntry {
        CacheEntry::new(
            prompt,
            vec![0.1, 0.2, 0.3],
            r#"{"answer": "test"}"#,
            "openai",
            "gpt-4",
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_normalize_prompt() {
        assert_eq!(normalize_prompt("  Hello World  "), "hello world");
        assert_eq!(normalize_prompt("HELLO"), "hello");
        assert_eq!(normalize_prompt("hello"), "hello");
    }

    #[test]
    fn test_prompt_hash_stable_across_case_and_whitespace() {
        assert_eq!(prompt_hash("Acme Pricing"), prompt_hash("  acme pricing "));
        assert_ne!(prompt_hash("Acme pricing"), prompt_hash("Globex pricing"));
    }

    #[test]
    fn test_prompt_hash_is_hex_sha256() {
        let hash = prompt_hash("hello");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_entry_creation() {
        let entry = create_entry("What is Rust?");

        assert_eq!(entry.prompt(), "What is Rust?");
        assert_eq!(entry.prompt_hash(), prompt_hash("what is rust?"));
        assert_eq!(entry.dimensions(), 3);
        assert_eq!(entry.provider(), "openai");
        assert_eq!(entry.model(), "gpt-4");
        assert_eq!(entry.hit_count(), 0);
        assert!(!entry.is_expired());
        assert!(entry.expires_at() > entry.created_at());
    }

    #[test]
    fn test_zero_ttl_clamped() {
        let entry = CacheEntry::new(
            "p",
            vec![0.1],
            "r",
            "openai",
            "gpt-4",
            Duration::from_secs(0),
        );

        // expires_at must stay strictly after created_at
        assert!(entry.expires_at() > entry.created_at());
    }

    #[test]
    fn test_expired_entry() {
        let entry = create_entry("p").with_expires_at(Utc::now() - chrono::Duration::seconds(5));

        assert!(entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_increment_hits() {
        let mut entry = create_entry("p");

        entry.increment_hits();
        entry.increment_hits();

        assert_eq!(entry.hit_count(), 2);
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("tenant".to_string(), serde_json::json!("acme"));

        let entry = create_entry("p").with_metadata(metadata);
        let json = serde_json::to_string(&entry).unwrap();
        let decoded: CacheEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.metadata().get("tenant"), Some(&serde_json::json!("acme")));
        assert_eq!(decoded.prompt_hash(), entry.prompt_hash());
        assert_eq!(decoded.embedding(), entry.embedding());
    }

    #[test]
    fn test_exact_hit_similarity() {
        let hit = CacheHit::exact(create_entry("p"));
        assert!((hit.similarity - 1.0).abs() < f32::EPSILON);
    }
}

//! Cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::CacheError;

/// Configuration for the semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Embedding model used to vectorize prompts
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Expected embedding vector length for the configured model
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Similarity threshold for semantic hits (0.0 to 1.0, inclusive match)
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,

    /// Entry lifetime in hours
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: u64,

    /// Key namespace in the durable store
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Per-token cost estimate used for the savings statistic
    #[serde(default = "default_cost_per_token")]
    pub cost_per_token: f64,

    /// Upper bound on a single embedding call
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    /// Upper bound on a single durable-store call
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_threshold() -> f32 {
    0.95
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_namespace() -> String {
    "semcache".to_string()
}

fn default_cost_per_token() -> f64 {
    0.00002
}

fn default_embed_timeout_secs() -> u64 {
    10
}

fn default_store_timeout_secs() -> u64 {
    5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            default_threshold: default_threshold(),
            default_ttl_hours: default_ttl_hours(),
            namespace: default_namespace(),
            cost_per_token: default_cost_per_token(),
            embed_timeout_secs: default_embed_timeout_secs(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl CacheConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the expected embedding dimensions
    pub fn with_embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.embedding_dimensions = dimensions;
        self
    }

    /// Set the default similarity threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Set the default TTL in hours
    pub fn with_ttl_hours(mut self, hours: u64) -> Self {
        self.default_ttl_hours = hours;
        self
    }

    /// Set the key namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the per-token cost estimate
    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    /// Set the embedding call timeout
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the durable-store call timeout
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_secs = timeout.as_secs();
        self
    }

    /// Default TTL as a Duration
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_hours * 3600)
    }

    /// Embedding timeout as a Duration
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    /// Store timeout as a Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Reject configurations that indicate a programming error
    pub fn validate(&self) -> Result<(), CacheError> {
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(CacheError::configuration(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.default_threshold
            )));
        }

        if self.embedding_dimensions == 0 {
            return Err(CacheError::configuration(
                "embedding dimensions must be greater than zero",
            ));
        }

        if self.default_ttl_hours == 0 {
            return Err(CacheError::configuration(
                "default TTL must be at least one hour",
            ));
        }

        if self.namespace.is_empty() {
            return Err(CacheError::configuration("namespace must not be empty"));
        }

        Ok(())
    }
}

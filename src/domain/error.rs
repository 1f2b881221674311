use thiserror::Error;

/// Errors raised inside the cache.
///
/// Only `InvalidConfiguration` is ever surfaced through the public service
/// contract; everything else is absorbed into miss/degrade behavior.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Embedding failure: {message}")]
    Embedding { message: String },

    #[error("Durable store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Durable store error: {message}")]
    Store { message: String },

    #[error("Malformed cache entry: {message}")]
    MalformedEntry { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CacheError {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn malformed_entry(message: impl Into<String>) -> Self {
        Self::MalformedEntry {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the durable tier is unreachable
    /// (as opposed to a request-level failure).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

//! Similarity matching over cache entries

use std::cmp::Ordering;

use crate::domain::entry::CacheEntry;

/// Calculate cosine similarity between two vectors.
///
/// Length mismatches and zero-norm vectors yield 0.0 by definition so the
/// scan never divides by zero and mismatched dimensions never match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Parameters for a similarity lookup
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Minimum similarity for a match (inclusive)
    pub threshold: f32,
    /// Only match entries produced by this provider
    pub provider: Option<String>,
    /// Only match entries produced by this model
    pub model: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            provider: None,
            model: None,
        }
    }
}

impl SearchParams {
    /// Create params with the given threshold
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    /// Filter matches to a provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Filter matches to a model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Whether an entry passes the provider/model filters
    pub fn matches_filters(&self, entry: &CacheEntry) -> bool {
        if let Some(ref provider) = self.provider {
            if entry.provider() != provider {
                return false;
            }
        }

        if let Some(ref model) = self.model {
            if entry.model() != model {
                return false;
            }
        }

        true
    }
}

/// Orders two scored candidates so the preferred one is `Ordering::Greater`.
///
/// Similarity decides; ties go to the more recent `created_at`, then to the
/// lexicographically smaller `prompt_hash`, making matching deterministic.
fn prefer(a: &(&CacheEntry, f32), b: &(&CacheEntry, f32)) -> Ordering {
    a.1.partial_cmp(&b.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.created_at().cmp(&b.0.created_at()))
        .then_with(|| b.0.prompt_hash().cmp(a.0.prompt_hash()))
}

/// Scan candidates for the best match at or above the threshold.
///
/// Candidates with an embedding dimension different from the query's are
/// never compared. The query vector is precomputed; the matcher never
/// embeds text itself.
pub fn best_match<'a, I>(query: &[f32], candidates: I, params: &SearchParams) -> Option<(&'a CacheEntry, f32)>
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    candidates
        .into_iter()
        .filter(|entry| !entry.is_expired())
        .filter(|entry| entry.dimensions() == query.len())
        .filter(|entry| params.matches_filters(entry))
        .map(|entry| (entry, cosine_similarity(query, entry.embedding())))
        .filter(|(_, similarity)| *similarity >= params.threshold)
        .max_by(prefer)
}

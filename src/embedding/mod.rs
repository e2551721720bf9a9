//! Embedding provider interface and query-embedding reuse.
//!
//! The engine never produces vectors itself; it consumes an external
//! provider behind [`EmbeddingProvider`] and reuses recent query
//! embeddings through [`EmbeddingCache`].

mod cache;
mod retry;

pub use cache::{CacheConfig, EmbeddingCache};
pub use retry::{RetryPolicy, RetryingProvider};

use crate::Result;

/// Task type passed to the embedding provider.
///
/// Providers distinguish document indexing from query lookup when
/// producing vectors; the two modes are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingMode {
    /// Embedding a piece of retrievable content.
    Document,
    /// Embedding a search query.
    #[default]
    Query,
}

impl EmbeddingMode {
    /// Returns the mode as a provider task-type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "retrieval_document",
            Self::Query => "retrieval_query",
        }
    }
}

/// Trait for embedding providers.
///
/// Implementations must surface failures rather than silently
/// returning an empty vector; the caller decides how to degrade.
/// Retry for transient failures belongs in a decorator (see
/// [`RetryingProvider`]), not in the retrieval engine.
#[allow(async_fn_in_trait)]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the embedding dimensionality (e.g. 768).
    fn dimensions(&self) -> usize;

    /// Produces an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ProviderUnavailable`] if the provider
    /// call fails, transiently or otherwise.
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>>;
}

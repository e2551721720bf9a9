//! # Medrag
//!
//! Hybrid retrieval and ranking engine for grounding clinical answers.
//!
//! Medrag retrieves passages from three knowledge sources — a user's
//! personal notes, the user's uploaded document chunks, and a curated
//! reference corpus — and merges them under a fixed source-priority
//! policy so a downstream generation step always sees personal context
//! ahead of reference material.
//!
//! ## Pipeline
//!
//! ```text
//! query -> normalize -> expand -> embedding cache / provider
//!       -> per-source vector search (concurrent fan-out)
//!       -> adaptive threshold filter -> rerank (notes)
//!       -> priority merge -> MergedContext
//! ```
//!
//! The engine owns no transport, persistence schema, or prompt text.
//! Embedding generation and the vector index are collaborators behind
//! the [`embedding::EmbeddingProvider`] and [`index::VectorSearch`]
//! traits.
//!
//! ## Example
//!
//! ```rust,ignore
//! use medrag::{HybridRetrievalService, RetrievalConfig, RetrievalQuery};
//!
//! let service = HybridRetrievalService::new(provider, index, RetrievalConfig::default());
//! let context = service.retrieve(&RetrievalQuery::new("dor de cabeça forte", owner)).await?;
//! if !context.has_context() {
//!     // caller may degrade to its web-search fallback
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod embedding;
pub mod index;
pub mod models;
pub mod services;

// Re-exports for convenience
pub use config::RetrievalConfig;
pub use embedding::{EmbeddingCache, EmbeddingMode, EmbeddingProvider, RetryPolicy};
pub use index::{InMemoryIndex, SearchScope, SourceHit, VectorSearch};
pub use models::{
    ItemId, MergedContext, OwnerId, QualityReport, RetrievalQuery, RetrievedItem, ScoredResult,
    SourceType,
};
pub use services::{
    HybridRetrievalService, QueryExpander, Reranker, ResponseQualityValidator, ThresholdPolicy,
};

/// Error type for medrag operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidQuery` | Empty or whitespace-only query, rejected before any provider call |
/// | `ProviderUnavailable` | Embedding provider or vector index call fails; during fan-out this is surfaced only when every source fails |
/// | `OperationFailed` | Config file I/O or parse failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The query was rejected before any provider call.
    ///
    /// Raised when the raw query text is empty or contains only
    /// whitespace. Never retried.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A collaborator (embedding provider or vector index) failed.
    ///
    /// During the per-source fan-out a failing source is isolated and
    /// degraded to zero results; this error reaches the caller only
    /// when the embedding provider fails or when all sources fail.
    /// Transient-failure retry is the provider adapter's concern
    /// (see [`embedding::RetryingProvider`]).
    #[error("provider '{provider}' unavailable: {cause}")]
    ProviderUnavailable {
        /// Which collaborator failed.
        provider: String,
        /// The underlying cause.
        cause: String,
    },

    /// An internal operation failed.
    ///
    /// Raised when configuration files cannot be read or parsed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for medrag operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Vector index abstraction.
//!
//! The engine does not implement approximate nearest-neighbor search;
//! it issues the [`VectorSearch`] contract against an external index
//! (pgvector, a managed service, or the bundled [`InMemoryIndex`]) and
//! shapes the result.
//!
//! # Contract
//!
//! - Hits are ordered by descending similarity.
//! - Similarity is cosine distance remapped to `[0, 1]` via
//!   `1 - distance` and clamped; a hit is returned only when
//!   `similarity > threshold`.
//! - `limit` bounds the candidate count.
//! - Personal collections are scoped to one owner; the reference
//!   corpus is shared and ignores the owner scope.

mod memory;

pub use memory::InMemoryIndex;

use crate::Result;
use crate::models::{OwnerId, RetrievedItem, SourceType};

/// Scope of one vector search: a source collection, optionally bound
/// to an owner for the personal collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchScope {
    /// Owner identity; `None` for shared collections.
    pub owner: Option<OwnerId>,
    /// Which source collection to search.
    pub source: SourceType,
}

impl SearchScope {
    /// Scope over one owner's personal collection.
    #[must_use]
    pub const fn owned(owner: OwnerId, source: SourceType) -> Self {
        Self {
            owner: Some(owner),
            source,
        }
    }

    /// Scope over a shared collection (the reference corpus).
    #[must_use]
    pub const fn shared(source: SourceType) -> Self {
        Self {
            owner: None,
            source,
        }
    }
}

/// One raw hit from the vector index, before ranking.
#[derive(Debug, Clone)]
pub struct SourceHit {
    /// The stored item.
    pub item: RetrievedItem,
    /// Similarity in `[0, 1]`.
    pub similarity: f32,
}

/// Trait for vector similarity search backends.
///
/// Implementations must be thread-safe (`Send + Sync`) and use
/// interior mutability so they can be shared across concurrent
/// retrievals.
#[allow(async_fn_in_trait)]
pub trait VectorSearch: Send + Sync {
    /// Searches one collection for the nearest items.
    ///
    /// Returns hits with `similarity > threshold`, ordered by
    /// descending similarity, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ProviderUnavailable`] if the index
    /// cannot be reached or the query fails.
    async fn search(
        &self,
        embedding: &[f32],
        scope: &SearchScope,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SourceHit>>;
}

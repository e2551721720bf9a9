//! Query types and normalization.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Owner/tenant identity that scopes personal collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Canonicalizes a raw query string for cache keys and expansion.
///
/// Trims surrounding whitespace and lower-cases the text. Two queries
/// that normalize identically share one embedding-cache entry.
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A retrieval request. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// The raw query text as the caller supplied it.
    pub text: String,
    /// Owner identity scoping the personal collections.
    pub owner: OwnerId,
    /// Optional override for the per-source result limit.
    pub limit: Option<usize>,
    /// Optional override for the base similarity threshold.
    pub threshold: Option<f32>,
}

impl RetrievalQuery {
    /// Creates a query with no tuning overrides.
    #[must_use]
    pub fn new(text: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            text: text.into(),
            owner,
            limit: None,
            threshold: None,
        }
    }

    /// Overrides the per-source result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Overrides the base similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Returns the normalized query text.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_query(&self.text)
    }

    /// Rejects empty or whitespace-only queries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] when the query carries no text.
    /// Validation happens before any provider call and is never retried.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidQuery("query text is empty".to_string()));
        }
        Ok(())
    }
}

//! In-process vector index.
//!
//! Reference implementation of [`VectorSearch`] backed by a brute-force
//! cosine scan. Suitable for tests and small corpora; production
//! deployments point the engine at a persisted index instead.

use super::{SearchScope, SourceHit, VectorSearch};
use crate::models::{OwnerId, RetrievedItem, SourceType};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One indexed item with its embedding and owner scope.
#[derive(Debug, Clone)]
struct IndexedItem {
    item: RetrievedItem,
    owner: Option<OwnerId>,
    embedding: Vec<f32>,
}

type Collections = HashMap<SourceType, Vec<IndexedItem>>;

/// Brute-force in-memory vector index.
///
/// Interior mutability keeps the API `&self` so the index can be
/// shared across concurrent retrievals.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    collections: Mutex<Collections>,
}

/// Helper to acquire the index lock with poison recovery.
fn acquire_lock(mutex: &Mutex<Collections>) -> MutexGuard<'_, Collections> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("in-memory index mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Cosine similarity remapped to `[0, 1]`.
///
/// The raw cosine lives in `[-1, 1]`; persisted indexes expose cosine
/// distance and the engine consumes `1 - distance`, so negative values
/// clamp to zero. Mismatched or zero-length vectors score zero.
#[must_use]
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

impl InMemoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item into its source collection.
    ///
    /// Personal items carry an owner; reference items pass `None`.
    pub fn upsert(&self, item: RetrievedItem, owner: Option<OwnerId>, embedding: Vec<f32>) {
        let source = item.source_type();
        let mut collections = acquire_lock(&self.collections);
        let items = collections.entry(source).or_default();
        // Replace any prior version of the same item.
        items.retain(|existing| existing.item.id() != item.id());
        items.push(IndexedItem {
            item,
            owner,
            embedding,
        });
    }

    /// Removes an item by ID from its source collection.
    pub fn remove(&self, source: SourceType, id: &crate::models::ItemId) -> bool {
        let mut collections = acquire_lock(&self.collections);
        let Some(items) = collections.get_mut(&source) else {
            return false;
        };
        let before = items.len();
        items.retain(|existing| existing.item.id() != id);
        items.len() != before
    }

    /// Total number of indexed items across collections.
    #[must_use]
    pub fn len(&self) -> usize {
        acquire_lock(&self.collections)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether the index holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VectorSearch for InMemoryIndex {
    async fn search(
        &self,
        embedding: &[f32],
        scope: &SearchScope,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SourceHit>> {
        if embedding.is_empty() {
            return Err(Error::ProviderUnavailable {
                provider: "vector_index".to_string(),
                cause: "query embedding is empty".to_string(),
            });
        }

        let collections = acquire_lock(&self.collections);
        let mut hits: Vec<SourceHit> = collections
            .get(&scope.source)
            .map(|items| {
                items
                    .iter()
                    .filter(|indexed| match scope.owner {
                        Some(owner) => indexed.owner == Some(owner),
                        None => true,
                    })
                    .map(|indexed| SourceHit {
                        item: indexed.item.clone(),
                        similarity: cosine_similarity(embedding, &indexed.embedding),
                    })
                    .filter(|hit| hit.similarity > threshold)
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, Note};

    fn note(id: &str, content: &str) -> RetrievedItem {
        RetrievedItem::Note(Note {
            id: ItemId::new(id),
            title: id.to_string(),
            content: content.to_string(),
            tags: Vec::new(),
            is_favorite: false,
            created_at: None,
            updated_at: None,
        })
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        // Opposite vectors clamp to zero, keeping similarity in [0, 1].
        assert!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity_and_applies_threshold() {
        let index = InMemoryIndex::new();
        let owner = OwnerId::generate();
        index.upsert(note("close", "a"), Some(owner), vec![1.0, 0.05]);
        index.upsert(note("far", "b"), Some(owner), vec![0.2, 1.0]);
        index.upsert(note("below", "c"), Some(owner), vec![-1.0, 0.0]);

        let scope = SearchScope::owned(owner, SourceType::Notes);
        let hits = index
            .search(&[1.0, 0.0], &scope, 10, 0.1)
            .await
            .expect("search");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.id().as_str(), "close");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn test_search_is_owner_scoped() {
        let index = InMemoryIndex::new();
        let owner_a = OwnerId::generate();
        let owner_b = OwnerId::generate();
        index.upsert(note("mine", "a"), Some(owner_a), vec![1.0, 0.0]);
        index.upsert(note("theirs", "b"), Some(owner_b), vec![1.0, 0.0]);

        let scope = SearchScope::owned(owner_a, SourceType::Notes);
        let hits = index
            .search(&[1.0, 0.0], &scope, 10, 0.0)
            .await
            .expect("search");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id().as_str(), "mine");
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let index = InMemoryIndex::new();
        let owner = OwnerId::generate();
        for i in 0..5 {
            index.upsert(note(&format!("n{i}"), "x"), Some(owner), vec![1.0, 0.1]);
        }

        let scope = SearchScope::owned(owner, SourceType::Notes);
        let hits = index
            .search(&[1.0, 0.0], &scope, 2, 0.0)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_embedding_is_provider_error() {
        let index = InMemoryIndex::new();
        let scope = SearchScope::shared(SourceType::Reference);
        let result = index.search(&[], &scope, 10, 0.0).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_upsert_replaces_and_remove() {
        let index = InMemoryIndex::new();
        let owner = OwnerId::generate();
        index.upsert(note("n1", "old"), Some(owner), vec![1.0]);
        index.upsert(note("n1", "new"), Some(owner), vec![0.5]);
        assert_eq!(index.len(), 1);

        assert!(index.remove(SourceType::Notes, &ItemId::new("n1")));
        assert!(index.is_empty());
        assert!(!index.remove(SourceType::Notes, &ItemId::new("n1")));
    }
}

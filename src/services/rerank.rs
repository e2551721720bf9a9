//! Multi-factor reranking.
//!
//! Raw similarity misses signals the user cares about: a pinned note
//! beats a marginally closer unpinned one, and a note written this
//! week beats one from last year. The reranker folds those signals
//! into a composite relevance score:
//!
//! ```text
//! relevance = 0.6·similarity + favorite + recency + tags, capped at 1.0
//! ```
//!
//! where `favorite` is 0.15 for pinned items, `recency` decays
//! linearly from 0.15 to zero over one year (unknown ages count as a
//! full year), and `tags` is 0.1 for items carrying at least one tag.
//!
//! Reranking is pure and total: it never fails, never adds or drops
//! items, and uses a stable sort so equal scores keep their original
//! order.

use crate::models::ScoredResult;
use chrono::Utc;

/// Weights of the composite relevance score.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceWeights {
    /// Weight of the raw similarity.
    pub similarity: f32,
    /// Bonus for favorite/pinned items.
    pub favorite: f32,
    /// Maximum recency bonus (decays to zero over `recency_window_days`).
    pub recency: f32,
    /// Bonus for items carrying at least one tag.
    pub tags: f32,
    /// Window over which the recency bonus decays, in days.
    pub recency_window_days: i64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            similarity: 0.6,
            favorite: 0.15,
            recency: 0.15,
            tags: 0.1,
            recency_window_days: 365,
        }
    }
}

/// Reorders results by composite relevance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reranker {
    weights: RelevanceWeights,
}

impl Reranker {
    /// Creates a reranker with the default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reranker with custom weights.
    #[must_use]
    pub const fn with_weights(weights: RelevanceWeights) -> Self {
        Self { weights }
    }

    /// Composite relevance for one result.
    #[must_use]
    pub fn relevance(&self, result: &ScoredResult) -> f32 {
        let w = &self.weights;
        let base = result.similarity * w.similarity;

        let favorite_bonus = if result.item.is_favorite() {
            w.favorite
        } else {
            0.0
        };

        let age_days = result.item.created_at().map_or(w.recency_window_days, |t| {
            (Utc::now() - t).num_days().max(0)
        });
        #[allow(clippy::cast_precision_loss)]
        let recency_bonus = w.recency
            * (1.0 - age_days.min(w.recency_window_days) as f32 / w.recency_window_days as f32);

        let tags_bonus = if result.item.has_tags() { w.tags } else { 0.0 };

        (base + favorite_bonus + recency_bonus + tags_bonus).min(1.0)
    }

    /// Recomputes relevance per result and sorts descending.
    ///
    /// The sort is stable: results with equal relevance keep their
    /// input order, so reranking never arbitrarily reorders ties.
    #[must_use]
    pub fn rerank(&self, mut results: Vec<ScoredResult>) -> Vec<ScoredResult> {
        for result in &mut results {
            result.relevance = self.relevance(result);
        }

        results.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results
    }
}

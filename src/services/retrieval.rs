//! Hybrid retrieval orchestration.
//!
//! Runs the full pipeline for one query: normalize, expand, resolve
//! the query embedding through the cache, fan out to the three source
//! collections concurrently, filter each source with the adaptive
//! threshold, rerank notes, and concatenate in strict priority order.
//!
//! # Source priority
//!
//! Personal notes, then uploaded documents, then the reference corpus.
//! The merge never interleaves sources on raw similarity; a weak note
//! still precedes a strong reference hit. Only notes are reranked —
//! the other sources carry no favorite/tag metadata the relevance
//! formula could use.
//!
//! # Failure isolation
//!
//! The three searches are independent; each is bounded by the
//! configured per-source timeout. A failing or timed-out source
//! degrades to zero results and the merge proceeds, surfacing a hard
//! error only when every source failed. An all-empty merge is the
//! "no context" terminal state, not an error — the caller may then
//! degrade to its web-search fallback.

use crate::config::RetrievalConfig;
use crate::embedding::{CacheConfig, EmbeddingCache, EmbeddingMode, EmbeddingProvider};
use crate::index::{SearchScope, SourceHit, VectorSearch};
use crate::models::{MergedContext, RetrievalQuery, ScoredResult, SourceType};
use crate::services::{QueryExpander, Reranker, ThresholdPolicy};
use crate::{Error, Result};
use std::sync::Arc;

/// The hybrid retrieval engine.
///
/// Holds the embedding provider and vector index collaborators plus
/// the pipeline policies. Cheap to share behind an `Arc`; the only
/// mutable state is the process-wide [`EmbeddingCache`].
pub struct HybridRetrievalService<P, V> {
    provider: P,
    index: V,
    cache: Arc<EmbeddingCache>,
    expander: QueryExpander,
    reranker: Reranker,
    thresholds: ThresholdPolicy,
    config: RetrievalConfig,
}

impl<P: EmbeddingProvider, V: VectorSearch> HybridRetrievalService<P, V> {
    /// Creates a service with its own embedding cache.
    #[must_use]
    pub fn new(provider: P, index: V, config: RetrievalConfig) -> Self {
        let cache = Arc::new(EmbeddingCache::new(
            CacheConfig::new()
                .with_ttl(config.cache_ttl())
                .with_capacity(config.cache_capacity),
        ));
        Self::with_cache(provider, index, config, cache)
    }

    /// Creates a service sharing an existing process-wide cache.
    #[must_use]
    pub fn with_cache(
        provider: P,
        index: V,
        config: RetrievalConfig,
        cache: Arc<EmbeddingCache>,
    ) -> Self {
        let thresholds = ThresholdPolicy::new(config.adaptive_min, config.adaptive_max);
        Self {
            provider,
            index,
            cache,
            expander: QueryExpander::new(),
            reranker: Reranker::new(),
            thresholds,
            config,
        }
    }

    /// Replaces the query expander.
    #[must_use]
    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = expander;
        self
    }

    /// Replaces the reranker.
    #[must_use]
    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = reranker;
        self
    }

    /// Returns the shared embedding cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Retrieves and merges context for one query.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidQuery`] when the query is empty.
    /// - [`Error::ProviderUnavailable`] when the embedding provider
    ///   fails, or when all three source searches fail.
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<MergedContext> {
        query.validate()?;

        let normalized = query.normalized();
        let search_text = if self.config.expand_query {
            self.expander.expand(&normalized)
        } else {
            normalized
        };
        tracing::debug!(query = %search_text, owner = %query.owner, "retrieving context");

        let embedding = self.query_embedding(&search_text).await?;

        // Independent fan-out; the join waits for all three branches
        // before merging, and dropping the future cancels them all.
        let (notes, documents, reference) = tokio::join!(
            self.search_source(SourceType::Notes, &embedding, query),
            self.search_source(SourceType::Documents, &embedding, query),
            self.search_source(SourceType::Reference, &embedding, query),
        );

        let outcomes = [&notes, &documents, &reference];
        if outcomes.iter().all(|outcome| outcome.is_err()) {
            return Err(Error::ProviderUnavailable {
                provider: "vector_index".to_string(),
                cause: "all source searches failed".to_string(),
            });
        }

        let merged = MergedContext::from_sources(
            Self::settle(SourceType::Notes, notes),
            Self::settle(SourceType::Documents, documents),
            Self::settle(SourceType::Reference, reference),
        );

        if merged.has_context() {
            tracing::debug!(
                notes = merged.note_count,
                documents = merged.document_count,
                reference = merged.reference_count,
                "context assembled"
            );
        } else {
            metrics::counter!("retrieval_no_context_total").increment(1);
            tracing::debug!("no context found in any source");
        }

        Ok(merged)
    }

    /// Resolves the query embedding through the cache, calling the
    /// provider only on a miss.
    async fn query_embedding(&self, search_text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.get(search_text) {
            return Ok(vector);
        }

        let vector = self
            .provider
            .embed(search_text, EmbeddingMode::Query)
            .await?;
        self.cache.put(search_text, vector.clone());
        Ok(vector)
    }

    /// Degrades a failed source to zero results, keeping the error out
    /// of the merge.
    fn settle(source: SourceType, outcome: Result<Vec<ScoredResult>>) -> Vec<ScoredResult> {
        match outcome {
            Ok(results) => results,
            Err(err) => {
                metrics::counter!(
                    "retrieval_source_failures_total",
                    "source" => source.as_str()
                )
                .increment(1);
                tracing::warn!(source = %source, error = %err, "source search failed, continuing without it");
                Vec::new()
            }
        }
    }

    /// Runs the per-source pipeline under the configured timeout.
    async fn search_source(
        &self,
        source: SourceType,
        embedding: &[f32],
        query: &RetrievalQuery,
    ) -> Result<Vec<ScoredResult>> {
        let searched = tokio::time::timeout(
            self.config.source_timeout(),
            self.search_source_inner(source, embedding, query),
        )
        .await;

        match searched {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ProviderUnavailable {
                provider: format!("vector_index/{source}"),
                cause: format!(
                    "search timed out after {}ms",
                    self.config.source_timeout_ms
                ),
            }),
        }
    }

    async fn search_source_inner(
        &self,
        source: SourceType,
        embedding: &[f32],
        query: &RetrievalQuery,
    ) -> Result<Vec<ScoredResult>> {
        let limit = query.limit.unwrap_or_else(|| self.config.limit_for(source));
        let threshold = query
            .threshold
            .unwrap_or_else(|| self.config.threshold_for(source));

        let hits = match source {
            SourceType::Notes => {
                // Over-fetch so reranking has candidates to promote.
                let fetch = if self.config.rerank_notes {
                    limit.saturating_mul(self.config.rerank_overfetch.max(1))
                } else {
                    limit
                };
                let scope = SearchScope::owned(query.owner, source);
                self.index
                    .search(embedding, &scope, fetch, threshold)
                    .await?
            }
            SourceType::Documents => {
                let scope = SearchScope::owned(query.owner, source);
                self.index
                    .search(embedding, &scope, limit, threshold)
                    .await?
            }
            SourceType::Reference => {
                // The curation rank, not similarity, decides which
                // reference candidates survive the limit: a similarity-
                // ordered fetch would cut a priority-1 protocol whenever
                // enough low-priority documents score higher. The corpus
                // is small and curated, so fetch it whole, order by
                // (priority, similarity), cut to the limit, and only
                // then filter on similarity.
                let scope = SearchScope::shared(source);
                let mut hits = self
                    .index
                    .search(embedding, &scope, usize::MAX, 0.0)
                    .await?;
                hits.sort_by(|a, b| {
                    let rank_a = a.item.priority_rank().unwrap_or(u32::MAX);
                    let rank_b = b.item.priority_rank().unwrap_or(u32::MAX);
                    rank_a.cmp(&rank_b).then_with(|| {
                        b.similarity
                            .partial_cmp(&a.similarity)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                });
                hits.truncate(limit);
                hits.retain(|hit| hit.similarity > threshold);
                hits
            }
        };

        let mut results = self.adaptive_filter(source, hits);

        if source == SourceType::Notes && self.config.rerank_notes {
            results = self.reranker.rerank(results);
            results.truncate(limit);
        }

        Ok(results)
    }

    /// Second filtering pass: drops hits below the threshold computed
    /// from this result set's own similarity distribution.
    fn adaptive_filter(&self, source: SourceType, hits: Vec<SourceHit>) -> Vec<ScoredResult> {
        let similarities: Vec<f32> = hits.iter().map(|hit| hit.similarity).collect();
        let effective = self.thresholds.compute(&similarities);
        tracing::trace!(source = %source, threshold = effective, candidates = hits.len(), "adaptive threshold");

        hits.into_iter()
            .filter(|hit| hit.similarity >= effective)
            .map(|hit| ScoredResult::new(hit.item, hit.similarity))
            .collect()
    }
}

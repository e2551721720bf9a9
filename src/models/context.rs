//! Scored results, the merged context, and answer-quality reports.

use super::{RetrievedItem, SourceType};
use serde::Serialize;

/// One retrieved item with its scores.
///
/// Produced per query execution; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    /// The retrieved item.
    pub item: RetrievedItem,
    /// Cosine similarity remapped to `[0, 1]`.
    pub similarity: f32,
    /// Composite relevance score; equals `similarity` for sources that
    /// are not reranked.
    pub relevance: f32,
    /// Source collection the item came from.
    pub source: SourceType,
}

impl ScoredResult {
    /// Creates a result whose relevance starts at its similarity.
    #[must_use]
    pub fn new(item: RetrievedItem, similarity: f32) -> Self {
        let source = item.source_type();
        Self {
            item,
            similarity,
            relevance: similarity,
            source,
        }
    }
}

/// The ordered, source-grouped output of a retrieval.
///
/// Invariant: every result of a higher-priority source precedes every
/// result of a lower-priority source, regardless of similarity. An
/// empty context is the well-defined "no context" terminal state — the
/// caller may degrade to its web-search fallback; it is never an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedContext {
    /// Results in strict source-priority order.
    pub results: Vec<ScoredResult>,
    /// How many results came from personal notes.
    pub note_count: usize,
    /// How many results came from uploaded documents.
    pub document_count: usize,
    /// How many results came from the reference corpus.
    pub reference_count: usize,
}

impl MergedContext {
    /// Assembles a context from per-source result lists, preserving
    /// the fixed priority order: notes, then documents, then reference.
    #[must_use]
    pub fn from_sources(
        notes: Vec<ScoredResult>,
        documents: Vec<ScoredResult>,
        reference: Vec<ScoredResult>,
    ) -> Self {
        let (note_count, document_count, reference_count) =
            (notes.len(), documents.len(), reference.len());
        let mut results = Vec::with_capacity(note_count + document_count + reference_count);
        results.extend(notes);
        results.extend(documents);
        results.extend(reference);
        Self {
            results,
            note_count,
            document_count,
            reference_count,
        }
    }

    /// Whether any source contributed results.
    #[must_use]
    pub fn has_context(&self) -> bool {
        !self.results.is_empty()
    }

    /// Total number of results across all sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the context is empty ("no context" terminal state).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Post-hoc quality metrics for a generated answer.
///
/// Derived per answer for observability only; the engine never blocks
/// or retries generation based on it.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    /// Fraction of query tokens also present in the response.
    pub term_overlap: f32,
    /// Whether the response appears grounded in the supplied context.
    pub uses_context: bool,
    /// Length-based completeness in `[0, 1]`.
    pub completeness: f32,
    /// Weighted overall score in `[0, 1]`.
    pub quality_score: f32,
    /// Whether `quality_score` clears the high-quality bar (0.6).
    pub is_high_quality: bool,
}

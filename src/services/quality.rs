//! Post-hoc answer-quality scoring.
//!
//! Scores a generated answer against the query and the context that
//! grounded it, flagging low-grounding responses for telemetry. The
//! score never blocks or retries generation; retry policy belongs to
//! the caller.
//!
//! ```text
//! quality = 0.4·termOverlap + 0.4·usesContext + 0.2·completeness
//! ```

use crate::models::{QualityReport, ScoredResult};
use std::collections::HashSet;

/// Marker words whose presence suggests the answer cites its sources
/// (pt-BR: note, document, source, protocol).
const DEFAULT_CITATION_MARKERS: [&str; 4] = ["anotação", "documento", "fonte", "protocolo"];

/// Minimum answer length (characters) before completeness credit.
const MIN_RESPONSE_CHARS: usize = 50;

/// Quality bar above which an answer counts as high quality.
const HIGH_QUALITY_BAR: f32 = 0.6;

/// Scores generated answers for grounding and completeness.
#[derive(Debug, Clone)]
pub struct ResponseQualityValidator {
    markers: Vec<String>,
}

impl ResponseQualityValidator {
    /// Creates a validator with the default citation markers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            markers: DEFAULT_CITATION_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }

    /// Replaces the citation marker words.
    #[must_use]
    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.markers = markers.iter().map(|m| (*m).to_lowercase()).collect();
        self
    }

    /// Scores a response against the query and the context it was
    /// generated from. Pure; never fails.
    #[must_use]
    pub fn validate(
        &self,
        response: &str,
        query: &str,
        context_used: &[ScoredResult],
    ) -> QualityReport {
        let response_lower = response.to_lowercase();
        let query_lower = query.to_lowercase();
        let query_set: HashSet<&str> = query_lower.split_whitespace().collect();
        let response_set: HashSet<&str> = response_lower.split_whitespace().collect();

        #[allow(clippy::cast_precision_loss)]
        let term_overlap =
            query_set.intersection(&response_set).count() as f32 / query_set.len().max(1) as f32;

        let uses_context = !context_used.is_empty()
            && self
                .markers
                .iter()
                .any(|marker| response_lower.contains(marker.as_str()));

        let response_chars = response.chars().count();
        #[allow(clippy::cast_precision_loss)]
        let completeness = if response_chars >= MIN_RESPONSE_CHARS {
            (response_chars as f32 / MIN_RESPONSE_CHARS as f32).min(1.0)
        } else {
            0.0
        };

        let quality_score = 0.4f32.mul_add(
            term_overlap,
            0.4f32.mul_add(f32::from(u8::from(uses_context)), 0.2 * completeness),
        );

        QualityReport {
            term_overlap,
            uses_context,
            completeness,
            quality_score,
            is_high_quality: quality_score >= HIGH_QUALITY_BAR,
        }
    }
}

impl Default for ResponseQualityValidator {
    fn default() -> Self {
        Self::new()
    }
}

//! Adaptive similarity threshold policy.
//!
//! A fixed global cutoff either drowns strong result sets in weak
//! tails or returns nothing for niche queries. This policy recomputes
//! the cutoff per query from the observed similarity distribution:
//! strong sets (mean > 0.6) tighten toward the ceiling, weak sets
//! (mean < 0.3) loosen toward the floor, and everything in between
//! keeps the configured floor.
//!
//! The computed threshold is applied as a second filtering pass over
//! an already-fetched result set; it narrows, never widens, the
//! index-level threshold.

/// Adaptive threshold policy with configured floor and ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    /// Lowest threshold the policy may return.
    pub min_threshold: f32,
    /// Highest threshold the policy may return.
    pub max_threshold: f32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            min_threshold: 0.2,
            max_threshold: 0.7,
        }
    }
}

impl ThresholdPolicy {
    /// Creates a policy with the given bounds.
    #[must_use]
    pub const fn new(min_threshold: f32, max_threshold: f32) -> Self {
        Self {
            min_threshold,
            max_threshold,
        }
    }

    /// Computes the effective threshold for a result set.
    ///
    /// An empty set returns the floor unchanged.
    #[must_use]
    pub fn compute(&self, similarities: &[f32]) -> f32 {
        if similarities.is_empty() {
            return self.min_threshold;
        }

        #[allow(clippy::cast_precision_loss)]
        let avg = similarities.iter().sum::<f32>() / similarities.len() as f32;

        if avg > 0.6 {
            // Strong results: be more selective.
            self.max_threshold.min(avg - 0.1)
        } else if avg < 0.3 {
            // Weak results: loosen so the query still returns something.
            self.min_threshold.max(avg - 0.05)
        } else {
            self.min_threshold
        }
    }
}

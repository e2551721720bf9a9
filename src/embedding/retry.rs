//! Retry decorator for embedding providers.
//!
//! Transient provider failures (rate limits, brief outages) are the
//! adapter's concern, not the retrieval engine's: the engine sees only
//! the final outcome. This wrapper owns the policy — a bounded number
//! of attempts with exponential backoff (2s, 4s, 8s by default).

use super::{EmbeddingMode, EmbeddingProvider};
use crate::Result;
use std::time::Duration;

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `base_delay * 2^n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt bound.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the backoff base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff delay before retrying after the given zero-based attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1 << attempt.min(16))
    }
}

/// Embedding provider wrapper that retries failed calls.
pub struct RetryingProvider<P: EmbeddingProvider> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: EmbeddingProvider> RetryingProvider<P> {
    /// Wraps a provider with the given retry policy.
    #[must_use]
    pub const fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the wrapped provider.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for RetryingProvider<P> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        let mut attempt = 0;
        loop {
            match self.inner.embed(text, mode).await {
                Ok(vector) => return Ok(vector),
                Err(err) if attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    metrics::counter!("embedding_retry_attempts_total").increment(1);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "embedding call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

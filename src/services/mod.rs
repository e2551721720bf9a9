//! Retrieval pipeline services.

mod expand;
mod quality;
mod rerank;
mod retrieval;
mod threshold;

pub use expand::QueryExpander;
pub use quality::ResponseQualityValidator;
pub use rerank::{RelevanceWeights, Reranker};
pub use retrieval::HybridRetrievalService;
pub use threshold::ThresholdPolicy;

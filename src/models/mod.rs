//! Data models for medrag.
//!
//! This module contains all the core data structures used throughout the engine.

mod context;
mod item;
mod query;

pub use context::{MergedContext, QualityReport, ScoredResult};
pub use item::{DocumentChunk, ItemId, Note, ReferenceDoc, RetrievedItem, SourceType};
pub use query::{OwnerId, RetrievalQuery, normalize_query};

//! # engram-retrieval
//!
//! Multi-strategy memory retrieval with isolation enforcement: temporal
//! recency, tag similarity, graph traversal, and a weighted hybrid that
//! fans out to all three.

mod context;
mod hybrid;
mod strategies;

pub use context::{IsolationLevel, RetrievalContext};
pub use hybrid::{HybridRetrieval, HybridWeights};
pub use strategies::{GraphRetrieval, SimilarityRetrieval, TemporalRetrieval};

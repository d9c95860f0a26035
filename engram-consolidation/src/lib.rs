//! # engram-consolidation
//!
//! Quality scoring, promotion to global scope, decay of stale memories,
//! and duplicate detection/merging.

mod engine;
mod quality;
mod similarity;

pub use engine::{Consolidator, ConsolidatorConfig, ConsolidationSummary};
pub use quality::QualityMetrics;
pub use similarity::jaccard_similarity;

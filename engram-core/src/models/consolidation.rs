use serde::{Deserialize, Serialize};

/// Raw per-memory inputs for the quality formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityInputs {
    pub memory_id: String,
    pub access_count: u32,
    pub created_at: i64,
    pub importance: Option<u8>,
    pub tag_count: u32,
    pub related_count: u32,
}

/// A computed quality score to write back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityUpdate {
    pub memory_id: String,
    pub quality_score: f64,
}

/// Minimal view of a memory for duplicate pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDigest {
    pub id: String,
    pub memory_type: crate::memory::MemoryType,
    pub created_at: i64,
    pub tags: Vec<String>,
}

/// An ordered duplicate pair (`first < second`) with its tag similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub first: String,
    pub second: String,
    pub similarity: f64,
}

use serde::{Deserialize, Serialize};

use crate::memory::MemoryType;

/// Raw retrieval candidate returned by the backend, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCandidate {
    pub memory_id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub created_at: i64,
    pub importance: Option<u8>,
    pub tags: Vec<String>,
    pub metadata: String,
}

/// Scored retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHit {
    pub memory_id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub created_at: i64,
    pub importance: Option<u8>,
    pub tags: Vec<String>,
    pub metadata: String,
    /// Relevance in [0, 1] (per strategy) or a weighted combination.
    pub score: f64,
}

impl MemoryHit {
    pub fn from_candidate(candidate: MemoryCandidate, score: f64) -> Self {
        Self {
            memory_id: candidate.memory_id,
            content: candidate.content,
            memory_type: candidate.memory_type,
            created_at: candidate.created_at,
            importance: candidate.importance,
            tags: candidate.tags,
            metadata: candidate.metadata,
            score,
        }
    }
}

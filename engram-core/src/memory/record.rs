use serde::{Deserialize, Serialize};

use super::types::{MemoryType, Outcome, ScopeKind};

/// The single scope edge every memory carries: either a specific project
/// or the owning agent type (universal scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryScope {
    pub kind: ScopeKind,
    pub id: String,
}

impl MemoryScope {
    pub fn project(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Project,
            id: id.into(),
        }
    }

    pub fn universal(agent_type: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::AgentType,
            id: agent_type.into(),
        }
    }
}

/// A fully materialized memory as stored in the graph.
/// All timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UUID v4 identifier.
    pub id: String,
    pub content: String,
    /// Owning agent type, denormalized onto the node for indexing.
    pub agent_type: String,
    /// Free-text category tag, e.g. `design_pattern`.
    pub category: String,
    pub memory_type: MemoryType,
    pub quality_score: f64,
    pub confidence: f64,
    /// Optional user-assigned importance, 1..=10.
    pub importance: Option<u8>,
    pub validation_count: u32,
    pub application_count: u32,
    pub success_rate: f64,
    pub access_count: u32,
    pub tags: Vec<String>,
    /// Opaque JSON string; parsed only at the facade boundary.
    pub metadata: String,
    pub created_at: i64,
    pub last_validated: i64,
    pub accessed_at: Option<i64>,
    pub last_used: Option<i64>,
    pub expires_at: Option<i64>,
    pub parent_id: Option<String>,
    /// Instance that created this memory, when known.
    pub agent_instance_id: Option<String>,
    pub scope: MemoryScope,
    /// Soft-delete marker set by decay or merging.
    pub archived: bool,
    pub promoted_at: Option<i64>,
    pub promoted_from: Option<String>,
    pub decayed_at: Option<i64>,
    pub merged_into: Option<String>,
    pub merged_at: Option<i64>,
    pub last_quality_update: Option<i64>,
}

/// Everything needed to persist a new memory. Built by the store after
/// validation; the backend writes it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDraft {
    pub id: String,
    pub content: String,
    pub agent_type: String,
    pub category: String,
    pub memory_type: MemoryType,
    pub quality_score: f64,
    pub confidence: f64,
    pub importance: Option<u8>,
    pub tags: Vec<String>,
    pub metadata: String,
    pub scope: MemoryScope,
    pub agent_instance_id: Option<String>,
    pub created_at: i64,
}

/// Partial update; `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub quality_score: Option<f64>,
    pub importance: Option<u8>,
    pub metadata: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.quality_score.is_none()
            && self.importance.is_none()
            && self.metadata.is_none()
            && self.tags.is_none()
    }
}

/// One application of a memory by an agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub memory_id: String,
    pub agent_instance_id: String,
    pub outcome: Outcome,
    pub feedback_score: Option<f64>,
    pub used_at: i64,
}

/// One validation of a memory by an agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub memory_id: String,
    pub agent_instance_id: String,
    pub outcome: Outcome,
    pub feedback_score: f64,
    pub notes: Option<String>,
    pub validated_at: i64,
}

/// Aggregate statistics for an agent type (or the whole store).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memories: u64,
    pub avg_quality: f64,
    pub total_applications: u64,
    pub avg_success_rate: f64,
}

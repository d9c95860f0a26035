use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::memory::{MemoryDraft, MemoryPatch, MemoryRecord, MemoryStats, UsageRecord, ValidationRecord};

/// Memory CRUD and usage/validation recording.
///
/// Derived-statistic updates (success rate, quality blends) run inside the
/// backend so each record operation is a single transaction.
#[async_trait]
pub trait MemoryOps {
    /// Persist a new memory with its ownership and scope edges.
    async fn create_memory(&self, draft: &MemoryDraft) -> EngramResult<()>;

    async fn get_memory(&self, id: &str) -> EngramResult<Option<MemoryRecord>>;

    /// Apply a partial update; returns false when the memory is missing.
    /// `last_validated` is refreshed on any applied update.
    async fn update_memory(&self, id: &str, patch: &MemoryPatch, now_ms: i64)
        -> EngramResult<bool>;

    /// Detach-delete; returns the number of deleted nodes (0 or 1).
    async fn delete_memory(&self, id: &str) -> EngramResult<u64>;

    /// Memories owned by an agent type, optionally narrowed to a project
    /// scope (project-specific or universal) and category, above a quality
    /// floor. Sorted by quality desc, then creation desc.
    async fn memories_by_agent_type(
        &self,
        agent_type: &str,
        project_id: Option<&str>,
        category: Option<&str>,
        min_quality: f64,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>>;

    /// Content/tag substring search, sorted by quality desc.
    async fn search_memories(
        &self,
        query: &str,
        agent_type: Option<&str>,
        project_id: Option<&str>,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>>;

    /// Well-validated high-quality memories for an agent type.
    async fn high_quality_memories(
        &self,
        agent_type: &str,
        min_quality: f64,
        min_validations: u32,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>>;

    /// Record a usage event and refresh derived statistics. Returns false
    /// (no-op) when the memory does not exist.
    async fn record_usage(&self, usage: &UsageRecord) -> EngramResult<bool>;

    /// Record a validation event and recompute the quality blend. Returns
    /// false when the memory does not exist.
    async fn record_validation(&self, validation: &ValidationRecord) -> EngramResult<bool>;

    /// Create an undirected relation between two memories (idempotent).
    async fn relate_memories(&self, first: &str, second: &str) -> EngramResult<bool>;

    /// Whether the agent type exists in the graph.
    async fn agent_type_exists(&self, id: &str) -> EngramResult<bool>;

    /// Aggregate statistics, optionally narrowed to one agent type.
    async fn memory_stats(&self, agent_type: Option<&str>) -> EngramResult<MemoryStats>;
}

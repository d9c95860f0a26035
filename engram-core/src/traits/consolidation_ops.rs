use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{MemoryDigest, QualityInputs, QualityUpdate};

/// Graph operations consumed by the consolidation sweeps.
#[async_trait]
pub trait ConsolidationOps {
    /// Quality-formula inputs for every non-archived memory, optionally
    /// narrowed to a project scope.
    async fn quality_inputs(&self, project_id: Option<&str>) -> EngramResult<Vec<QualityInputs>>;

    /// Write computed quality scores; returns the update count.
    async fn write_quality_scores(
        &self,
        updates: &[QualityUpdate],
        now_ms: i64,
    ) -> EngramResult<u64>;

    /// Every memory in a project at or above `min_score` that is not yet
    /// promoted to the global project, oldest first.
    async fn promotion_candidates(
        &self,
        project_id: &str,
        min_score: f64,
    ) -> EngramResult<Vec<String>>;

    /// Add promotion edges to the global project (created on demand);
    /// records `promoted_at` and `promoted_from`.
    async fn promote_memories(
        &self,
        ids: &[String],
        from_project: &str,
        now_ms: i64,
    ) -> EngramResult<u64>;

    /// Every non-archived memory created before `cutoff_ms` with fewer
    /// than `max_access` accesses and quality below `max_quality`,
    /// oldest first.
    async fn decay_candidates(
        &self,
        cutoff_ms: i64,
        max_access: u32,
        max_quality: f64,
    ) -> EngramResult<Vec<String>>;

    /// Decrement importance (floor 1), archive, and stamp `decayed_at`.
    async fn decay_memories(&self, ids: &[String], now_ms: i64) -> EngramResult<u64>;

    /// Digest of every non-archived memory scoped to a project, for
    /// duplicate pairing.
    async fn memory_digests(&self, project_id: &str) -> EngramResult<Vec<MemoryDigest>>;

    /// Apply a computed merge: write the union tags and merged metadata to
    /// `keep_id`, transfer non-duplicate relations from `merge_id`, and
    /// archive `merge_id` with `merged_into`/`merged_at`. The merged
    /// memory is never deleted.
    async fn apply_merge(
        &self,
        keep_id: &str,
        merge_id: &str,
        merged_tags: &[String],
        merged_metadata: &str,
        now_ms: i64,
    ) -> EngramResult<bool>;
}

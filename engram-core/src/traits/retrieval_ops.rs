use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{IsolationFilter, MemoryCandidate};

/// Raw candidate queries for the retrieval strategies. Scoring happens in
/// the retrieval engine; backends only filter and order.
#[async_trait]
pub trait RetrievalOps {
    /// Visible memories sorted by creation time, newest first.
    async fn recent_memories(
        &self,
        filter: &IsolationFilter,
        limit: usize,
    ) -> EngramResult<Vec<MemoryCandidate>>;

    /// Visible memories whose tag set intersects `query_tags`, with the
    /// intersection size, sorted by match count desc then importance desc.
    async fn tag_overlap_memories(
        &self,
        filter: &IsolationFilter,
        query_tags: &[String],
        limit: usize,
    ) -> EngramResult<Vec<(MemoryCandidate, u32)>>;

    /// Memories related to `start_id` within `max_depth` hops (excluding
    /// the start), with their distance, sorted by distance asc then
    /// importance desc.
    async fn related_memories(
        &self,
        filter: &IsolationFilter,
        start_id: &str,
        max_depth: u32,
        limit: usize,
    ) -> EngramResult<Vec<(MemoryCandidate, u32)>>;
}

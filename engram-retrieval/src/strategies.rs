//! The three single-strategy retrievers. Backends return ordered raw
//! candidates; scoring happens here.

use std::sync::Arc;

use engram_core::errors::EngramResult;
use engram_core::models::MemoryHit;
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, RetrievalOps};

use crate::context::RetrievalContext;

/// Time-based retrieval: newest first, positional scoring.
pub struct TemporalRetrieval {
    backend: Arc<dyn GraphBackend>,
}

impl TemporalRetrieval {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    pub async fn retrieve(
        &self,
        context: &RetrievalContext,
        limit: usize,
    ) -> EngramResult<Vec<MemoryHit>> {
        context.validate()?;
        let filter = context.to_filter(now_ms());
        let candidates = self.backend.recent_memories(&filter, limit).await?;

        let total = candidates.len();
        Ok(candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let score = 1.0 - (index as f64 / total as f64);
                MemoryHit::from_candidate(candidate, score)
            })
            .collect())
    }
}

/// Tag-overlap retrieval. Scores are normalized against the best match;
/// full vector similarity is reserved for a future phase.
pub struct SimilarityRetrieval {
    backend: Arc<dyn GraphBackend>,
}

impl SimilarityRetrieval {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    pub async fn retrieve(
        &self,
        context: &RetrievalContext,
        limit: usize,
        query_tags: &[String],
    ) -> EngramResult<Vec<MemoryHit>> {
        context.validate()?;
        if query_tags.is_empty() {
            tracing::warn!("no query tags provided, returning empty results");
            return Ok(Vec::new());
        }
        let filter = context.to_filter(now_ms());
        let ranked = self
            .backend
            .tag_overlap_memories(&filter, query_tags, limit)
            .await?;

        let max_matches = ranked.first().map(|(_, count)| *count).unwrap_or(1).max(1);
        Ok(ranked
            .into_iter()
            .map(|(candidate, count)| {
                let score = f64::from(count) / f64::from(max_matches);
                MemoryHit::from_candidate(candidate, score)
            })
            .collect())
    }
}

/// Relation-graph retrieval: neighbors of a starting memory at depth 1–2,
/// nearer first.
pub struct GraphRetrieval {
    backend: Arc<dyn GraphBackend>,
}

impl GraphRetrieval {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    pub async fn retrieve(
        &self,
        context: &RetrievalContext,
        limit: usize,
        start_memory_id: &str,
    ) -> EngramResult<Vec<MemoryHit>> {
        context.validate()?;
        if start_memory_id.is_empty() {
            tracing::warn!("no start memory provided, returning empty results");
            return Ok(Vec::new());
        }
        let filter = context.to_filter(now_ms());
        let ranked = self
            .backend
            .related_memories(&filter, start_memory_id, 2, limit)
            .await?;

        let max_distance = ranked
            .iter()
            .map(|(_, distance)| *distance)
            .max()
            .unwrap_or(1)
            .max(1);
        Ok(ranked
            .into_iter()
            .map(|(candidate, distance)| {
                let score = 1.0 - f64::from(distance) / f64::from(max_distance);
                MemoryHit::from_candidate(candidate, score)
            })
            .collect())
    }
}

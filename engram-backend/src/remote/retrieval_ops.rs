//! Raw candidate queries for the retrieval strategies.

use async_trait::async_trait;
use neo4rs::Query;

use engram_core::errors::EngramResult;
use engram_core::models::{IsolationFilter, MemoryCandidate};
use engram_core::traits::RetrievalOps;

use super::filters::{bind_isolation, isolation_fragment};
use super::rows::{req, row_to_candidate, CANDIDATE_RETURN};
use super::RemoteBackend;

const CANDIDATE_MATCH: &str = "MATCH (at:AgentType)-[:HAS_MEMORY]->(m:Memory)
     MATCH (m)-[:SCOPED_TO]->(scope)";

#[async_trait]
impl RetrievalOps for RemoteBackend {
    async fn recent_memories(
        &self,
        filter: &IsolationFilter,
        limit: usize,
    ) -> EngramResult<Vec<MemoryCandidate>> {
        let cypher = format!(
            "{CANDIDATE_MATCH}
             WHERE {}
             RETURN {CANDIDATE_RETURN}
             ORDER BY m.created_at DESC
             LIMIT $limit",
            isolation_fragment(filter)
        );
        let query = bind_isolation(Query::new(cypher), filter).param("limit", limit as i64);
        let rows = self.run_read(query).await?;
        rows.iter().map(row_to_candidate).collect()
    }

    async fn tag_overlap_memories(
        &self,
        filter: &IsolationFilter,
        query_tags: &[String],
        limit: usize,
    ) -> EngramResult<Vec<(MemoryCandidate, u32)>> {
        if query_tags.is_empty() {
            return Ok(Vec::new());
        }
        let cypher = format!(
            "{CANDIDATE_MATCH}
             WHERE {} AND m.tags IS NOT NULL
             WITH m,
                  [tag IN m.tags WHERE tag IN $query_tags] as matching_tags
             WHERE size(matching_tags) > 0
             RETURN {CANDIDATE_RETURN}, size(matching_tags) as match_count
             ORDER BY match_count DESC, m.importance DESC
             LIMIT $limit",
            isolation_fragment(filter)
        );
        let query = bind_isolation(Query::new(cypher), filter)
            .param("query_tags", query_tags.to_vec())
            .param("limit", limit as i64);

        let rows = self.run_read(query).await?;
        rows.iter()
            .map(|row| {
                let candidate = row_to_candidate(row)?;
                let matches = req::<i64>(row, "match_count")? as u32;
                Ok((candidate, matches))
            })
            .collect()
    }

    async fn related_memories(
        &self,
        filter: &IsolationFilter,
        start_id: &str,
        max_depth: u32,
        limit: usize,
    ) -> EngramResult<Vec<(MemoryCandidate, u32)>> {
        let depth = max_depth.clamp(1, 2);
        let cypher = format!(
            "MATCH (start:Memory {{id: $start_id}})
             MATCH path = (start)-[:RELATED_TO*1..{depth}]-(m:Memory)
             MATCH (at:AgentType)-[:HAS_MEMORY]->(m)
             MATCH (m)-[:SCOPED_TO]->(scope)
             WHERE {} AND m.id <> $start_id
             WITH m, min(length(path)) as distance
             RETURN {CANDIDATE_RETURN}, distance
             ORDER BY distance ASC, m.importance DESC
             LIMIT $limit",
            isolation_fragment(filter)
        );
        let query = bind_isolation(Query::new(cypher), filter)
            .param("start_id", start_id)
            .param("limit", limit as i64);

        let rows = self.run_read(query).await?;
        rows.iter()
            .map(|row| {
                let candidate = row_to_candidate(row)?;
                let distance = req::<i64>(row, "distance")? as u32;
                Ok((candidate, distance))
            })
            .collect()
    }
}

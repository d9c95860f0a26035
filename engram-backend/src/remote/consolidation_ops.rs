//! Consolidation sweeps as parameterized Cypher.

use async_trait::async_trait;
use neo4rs::Query;

use engram_core::constants::GLOBAL_PROJECT_ID;
use engram_core::errors::EngramResult;
use engram_core::memory::MemoryType;
use engram_core::models::{MemoryDigest, QualityInputs, QualityUpdate};
use engram_core::traits::ConsolidationOps;

use super::rows::{opt, req};
use super::RemoteBackend;

#[async_trait]
impl ConsolidationOps for RemoteBackend {
    async fn quality_inputs(&self, project_id: Option<&str>) -> EngramResult<Vec<QualityInputs>> {
        let mut cypher = String::from("MATCH (m:Memory) WHERE NOT m:Archived");
        if project_id.is_some() {
            cypher.push_str(
                " AND exists((m)-[:SCOPED_TO]->(:Project {id: $project_id}))",
            );
        }
        cypher.push_str(
            " OPTIONAL MATCH (m)-[r:RELATED_TO]-()
              WITH m, count(DISTINCT r) as related
              RETURN m.id as memory_id,
                     coalesce(m.access_count, 0) as access_count,
                     m.created_at as created_at,
                     m.importance as importance,
                     size(coalesce(m.tags, [])) as tag_count,
                     related as related_count
              ORDER BY m.created_at DESC",
        );
        let mut query = Query::new(cypher);
        if let Some(project) = project_id {
            query = query.param("project_id", project);
        }

        let rows = self.run_read(query).await?;
        rows.iter()
            .map(|row| {
                Ok(QualityInputs {
                    memory_id: req(row, "memory_id")?,
                    access_count: req::<i64>(row, "access_count")? as u32,
                    created_at: req(row, "created_at")?,
                    importance: opt::<i64>(row, "importance").map(|v| v as u8),
                    tag_count: req::<i64>(row, "tag_count")? as u32,
                    related_count: req::<i64>(row, "related_count")? as u32,
                })
            })
            .collect()
    }

    async fn write_quality_scores(
        &self,
        updates: &[QualityUpdate],
        now_ms: i64,
    ) -> EngramResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let ids: Vec<String> = updates.iter().map(|u| u.memory_id.clone()).collect();
        let scores: Vec<f64> = updates.iter().map(|u| u.quality_score).collect();
        let rows = self
            .run_write(
                Query::new(
                    "UNWIND range(0, size($ids) - 1) as i
                     MATCH (m:Memory {id: $ids[i]})
                     SET m.quality_score = $scores[i],
                         m.last_quality_update = $now
                     RETURN count(m) as updated"
                        .to_string(),
                )
                .param("ids", ids)
                .param("scores", scores)
                .param("now", now_ms),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "updated")? as u64),
            None => Ok(0),
        }
    }

    async fn promotion_candidates(
        &self,
        project_id: &str,
        min_score: f64,
    ) -> EngramResult<Vec<String>> {
        let cypher = format!(
            "MATCH (m:Memory)-[:SCOPED_TO]->(p:Project {{id: $project_id}})
             WHERE m.quality_score >= $min_score
               AND NOT m:Archived
               AND NOT exists((m)-[:PROMOTED_TO]->(:Project {{id: '{GLOBAL_PROJECT_ID}'}}))
             RETURN m.id as memory_id
             ORDER BY m.created_at ASC, m.id ASC"
        );
        let rows = self
            .run_read(
                Query::new(cypher)
                    .param("project_id", project_id)
                    .param("min_score", min_score),
            )
            .await?;
        rows.iter().map(|row| req(row, "memory_id")).collect()
    }

    async fn promote_memories(
        &self,
        ids: &[String],
        from_project: &str,
        now_ms: i64,
    ) -> EngramResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let cypher = format!(
            "MERGE (global:Project {{id: '{GLOBAL_PROJECT_ID}'}})
             ON CREATE SET global.created_at = $now
             WITH global
             MATCH (m:Memory)
             WHERE m.id IN $ids AND NOT exists((m)-[:PROMOTED_TO]->(global))
             CREATE (m)-[:PROMOTED_TO {{promoted_at: $now}}]->(global)
             SET m.promoted_at = $now,
                 m.promoted_from = $from_project
             RETURN count(m) as promoted"
        );
        let rows = self
            .run_write(
                Query::new(cypher)
                    .param("ids", ids.to_vec())
                    .param("from_project", from_project)
                    .param("now", now_ms),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "promoted")? as u64),
            None => Ok(0),
        }
    }

    async fn decay_candidates(
        &self,
        cutoff_ms: i64,
        max_access: u32,
        max_quality: f64,
    ) -> EngramResult<Vec<String>> {
        let rows = self
            .run_read(
                Query::new(
                    "MATCH (m:Memory)
                     WHERE m.created_at < $cutoff
                       AND coalesce(m.access_count, 0) < $max_access
                       AND coalesce(m.quality_score, 0) < $max_quality
                       AND NOT m:Archived
                     RETURN m.id as memory_id
                     ORDER BY m.created_at ASC, m.id ASC"
                        .to_string(),
                )
                .param("cutoff", cutoff_ms)
                .param("max_access", i64::from(max_access))
                .param("max_quality", max_quality),
            )
            .await?;
        rows.iter().map(|row| req(row, "memory_id")).collect()
    }

    async fn decay_memories(&self, ids: &[String], now_ms: i64) -> EngramResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (m:Memory)
                     WHERE m.id IN $ids AND NOT m:Archived
                     SET m.importance = CASE
                             WHEN coalesce(m.importance, 5) > 1
                                 THEN coalesce(m.importance, 5) - 1
                             ELSE 1
                         END,
                         m.decayed_at = $now,
                         m:Archived
                     RETURN count(m) as decayed"
                        .to_string(),
                )
                .param("ids", ids.to_vec())
                .param("now", now_ms),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "decayed")? as u64),
            None => Ok(0),
        }
    }

    async fn memory_digests(&self, project_id: &str) -> EngramResult<Vec<MemoryDigest>> {
        let rows = self
            .run_read(
                Query::new(
                    "MATCH (m:Memory)-[:SCOPED_TO]->(:Project {id: $project_id})
                     WHERE NOT m:Archived
                     RETURN m.id as id,
                            m.memory_type as memory_type,
                            m.created_at as created_at,
                            coalesce(m.tags, []) as tags"
                        .to_string(),
                )
                .param("project_id", project_id),
            )
            .await?;
        rows.iter()
            .map(|row| {
                let type_raw: String = req(row, "memory_type")?;
                Ok(MemoryDigest {
                    id: req(row, "id")?,
                    memory_type: MemoryType::parse(&type_raw)?,
                    created_at: req(row, "created_at")?,
                    tags: opt(row, "tags").unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn apply_merge(
        &self,
        keep_id: &str,
        merge_id: &str,
        merged_tags: &[String],
        merged_metadata: &str,
        now_ms: i64,
    ) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (keep:Memory {id: $keep_id}), (merge:Memory {id: $merge_id})
                     WHERE merge.merged_into IS NULL
                     SET keep.tags = $tags,
                         keep.metadata = $metadata
                     WITH keep, merge
                     OPTIONAL MATCH (merge)-[:RELATED_TO]-(other:Memory)
                     WHERE other.id <> keep.id
                       AND NOT exists((keep)-[:RELATED_TO]-(other))
                     FOREACH (o IN CASE WHEN other IS NULL THEN [] ELSE [other] END |
                         CREATE (keep)-[:RELATED_TO]->(o)
                     )
                     WITH DISTINCT keep, merge
                     SET merge.merged_into = $keep_id,
                         merge.merged_at = $now,
                         merge:Archived
                     RETURN count(merge) as merged"
                        .to_string(),
                )
                .param("keep_id", keep_id)
                .param("merge_id", merge_id)
                .param("tags", merged_tags.to_vec())
                .param("metadata", merged_metadata)
                .param("now", now_ms),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "merged")? > 0),
            None => Ok(false),
        }
    }
}

//! Memory CRUD and usage/validation recording, as parameterized Cypher.

use async_trait::async_trait;
use neo4rs::Query;

use engram_core::errors::EngramResult;
use engram_core::memory::{
    MemoryDraft, MemoryPatch, MemoryRecord, MemoryStats, ScopeKind, UsageRecord,
    ValidationRecord,
};
use engram_core::traits::MemoryOps;

use super::rows::{opt, req, row_to_memory, MEMORY_RETURN};
use super::RemoteBackend;

fn rows_to_memories(rows: Vec<neo4rs::Row>) -> EngramResult<Vec<MemoryRecord>> {
    rows.iter().map(row_to_memory).collect()
}

#[async_trait]
impl MemoryOps for RemoteBackend {
    async fn create_memory(&self, draft: &MemoryDraft) -> EngramResult<()> {
        let scope_clause = match draft.scope.kind {
            ScopeKind::Project => {
                "MERGE (p:Project {id: $scope_id})
                 ON CREATE SET p.created_at = $created_at
                 CREATE (m)-[:SCOPED_TO {scope_type: 'project_specific', created_at: $created_at}]->(p)"
            }
            ScopeKind::AgentType => {
                "CREATE (m)-[:SCOPED_TO {scope_type: 'universal', created_at: $created_at}]->(at)"
            }
        };
        // Absent optionals become null literals so the property map stays
        // fixed-shape.
        let importance_term = if draft.importance.is_some() {
            "$importance"
        } else {
            "null"
        };
        let instance_term = if draft.agent_instance_id.is_some() {
            "$instance_id"
        } else {
            "null"
        };
        let cypher = format!(
            "MATCH (at:AgentType {{id: $agent_type}})
             CREATE (m:Memory {{
                 id: $id,
                 content: $content,
                 agent_type: $agent_type,
                 category: $category,
                 memory_type: $memory_type,
                 quality_score: $quality_score,
                 confidence: $confidence,
                 importance: {importance_term},
                 validation_count: 0,
                 application_count: 0,
                 success_rate: 0.0,
                 access_count: 0,
                 tags: $tags,
                 metadata: $metadata,
                 created_at: $created_at,
                 last_validated: $created_at,
                 agent_instance_id: {instance_term}
             }})
             CREATE (at)-[:HAS_MEMORY {{created_at: $created_at, shared: true}}]->(m)
             WITH m, at
             {scope_clause}
             RETURN m.id as id"
        );

        let mut query = Query::new(cypher)
            .param("id", draft.id.as_str())
            .param("content", draft.content.as_str())
            .param("agent_type", draft.agent_type.as_str())
            .param("category", draft.category.as_str())
            .param("memory_type", draft.memory_type.as_str())
            .param("quality_score", draft.quality_score)
            .param("confidence", draft.confidence)
            .param("tags", draft.tags.clone())
            .param("metadata", draft.metadata.as_str())
            .param("created_at", draft.created_at)
            .param("scope_id", draft.scope.id.as_str());
        if let Some(importance) = draft.importance {
            query = query.param("importance", i64::from(importance));
        }
        if let Some(instance) = &draft.agent_instance_id {
            query = query.param("instance_id", instance.as_str());
        }

        self.run_write(query).await.map(|_| ())
    }

    async fn get_memory(&self, id: &str) -> EngramResult<Option<MemoryRecord>> {
        let cypher = format!(
            "MATCH (m:Memory {{id: $id}})
             OPTIONAL MATCH (at:AgentType)-[:HAS_MEMORY]->(m)
             OPTIONAL MATCH (m)-[:SCOPED_TO]->(scope)
             RETURN {MEMORY_RETURN}"
        );
        let rows = self.run_read(Query::new(cypher).param("id", id)).await?;
        rows.first().map(row_to_memory).transpose()
    }

    async fn update_memory(
        &self,
        id: &str,
        patch: &MemoryPatch,
        now_ms: i64,
    ) -> EngramResult<bool> {
        if patch.is_empty() {
            return Ok(true);
        }
        let mut sets: Vec<&str> = Vec::new();
        if patch.content.is_some() {
            sets.push("m.content = $content");
        }
        if patch.quality_score.is_some() {
            sets.push("m.quality_score = $quality_score");
        }
        if patch.importance.is_some() {
            sets.push("m.importance = $importance");
        }
        if patch.metadata.is_some() {
            sets.push("m.metadata = $metadata");
        }
        if patch.tags.is_some() {
            sets.push("m.tags = $tags");
        }
        sets.push("m.last_validated = $now");

        let cypher = format!(
            "MATCH (m:Memory {{id: $id}}) SET {} RETURN m.id as id",
            sets.join(", ")
        );
        let mut query = Query::new(cypher).param("id", id).param("now", now_ms);
        if let Some(content) = &patch.content {
            query = query.param("content", content.as_str());
        }
        if let Some(quality) = patch.quality_score {
            query = query.param("quality_score", quality);
        }
        if let Some(importance) = patch.importance {
            query = query.param("importance", i64::from(importance));
        }
        if let Some(metadata) = &patch.metadata {
            query = query.param("metadata", metadata.as_str());
        }
        if let Some(tags) = &patch.tags {
            query = query.param("tags", tags.clone());
        }

        let rows = self.run_write(query).await?;
        Ok(!rows.is_empty())
    }

    async fn delete_memory(&self, id: &str) -> EngramResult<u64> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (m:Memory {id: $id})
                     DETACH DELETE m
                     RETURN count(m) as deleted"
                        .to_string(),
                )
                .param("id", id),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "deleted")? as u64),
            None => Ok(0),
        }
    }

    async fn memories_by_agent_type(
        &self,
        agent_type: &str,
        project_id: Option<&str>,
        category: Option<&str>,
        min_quality: f64,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        let mut cypher = String::from(
            "MATCH (at:AgentType {id: $agent_type})-[:HAS_MEMORY]->(m:Memory)
             MATCH (m)-[:SCOPED_TO]->(scope)
             WHERE m.quality_score >= $min_quality AND NOT m:Archived",
        );
        if project_id.is_some() {
            cypher.push_str(
                " AND ((scope:Project AND scope.id = $project_id) OR scope:AgentType)",
            );
        }
        if category.is_some() {
            cypher.push_str(" AND m.category = $category");
        }
        cypher.push_str(&format!(
            " RETURN {MEMORY_RETURN}
              ORDER BY m.quality_score DESC, m.created_at DESC
              LIMIT $limit"
        ));

        let mut query = Query::new(cypher)
            .param("agent_type", agent_type)
            .param("min_quality", min_quality)
            .param("limit", limit as i64);
        if let Some(project) = project_id {
            query = query.param("project_id", project);
        }
        if let Some(category) = category {
            query = query.param("category", category);
        }

        rows_to_memories(self.run_read(query).await?)
    }

    async fn search_memories(
        &self,
        search: &str,
        agent_type: Option<&str>,
        project_id: Option<&str>,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        let mut cypher = String::from(
            "MATCH (at:AgentType)-[:HAS_MEMORY]->(m:Memory)
             MATCH (m)-[:SCOPED_TO]->(scope)
             WHERE NOT m:Archived
               AND (m.content CONTAINS $query
                    OR any(tag IN m.tags WHERE tag CONTAINS $query))",
        );
        if agent_type.is_some() {
            cypher.push_str(" AND at.id = $agent_type");
        }
        if project_id.is_some() {
            cypher.push_str(
                " AND ((scope:Project AND scope.id = $project_id) OR scope:AgentType)",
            );
        }
        cypher.push_str(&format!(
            " RETURN {MEMORY_RETURN}
              ORDER BY m.quality_score DESC
              LIMIT $limit"
        ));

        let mut query = Query::new(cypher)
            .param("query", search)
            .param("limit", limit as i64);
        if let Some(agent_type) = agent_type {
            query = query.param("agent_type", agent_type);
        }
        if let Some(project) = project_id {
            query = query.param("project_id", project);
        }

        rows_to_memories(self.run_read(query).await?)
    }

    async fn high_quality_memories(
        &self,
        agent_type: &str,
        min_quality: f64,
        min_validations: u32,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        let cypher = format!(
            "MATCH (at:AgentType {{id: $agent_type}})-[:HAS_MEMORY]->(m:Memory)
             MATCH (m)-[:SCOPED_TO]->(scope)
             WHERE m.quality_score >= $min_quality
               AND m.validation_count >= $min_validations
               AND NOT m:Archived
             RETURN {MEMORY_RETURN}
             ORDER BY m.quality_score DESC, m.validation_count DESC
             LIMIT $limit"
        );
        let query = Query::new(cypher)
            .param("agent_type", agent_type)
            .param("min_quality", min_quality)
            .param("min_validations", i64::from(min_validations))
            .param("limit", limit as i64);

        rows_to_memories(self.run_read(query).await?)
    }

    async fn record_usage(&self, usage: &UsageRecord) -> EngramResult<bool> {
        let feedback_term = if usage.feedback_score.is_some() {
            "$feedback_score"
        } else {
            "null"
        };
        let cypher = format!(
            "MATCH (m:Memory {{id: $memory_id}})
             MERGE (ai:AgentInstance {{id: $instance_id}})
             CREATE (ai)-[:USED {{
                 used_at: $used_at,
                 outcome: $outcome,
                 feedback_score: {feedback_term}
             }}]->(m)
             SET m.application_count = m.application_count + 1,
                 m.access_count = coalesce(m.access_count, 0) + 1,
                 m.last_used = $used_at,
                 m.accessed_at = $used_at
             WITH m
             MATCH (m)<-[u:USED]-()
             WITH m,
                  count(u) as total_uses,
                  size([x IN collect(u) WHERE x.outcome = 'successful']) as successes
             SET m.success_rate = toFloat(successes) / toFloat(total_uses)
             WITH m
             FOREACH (_ IN CASE WHEN {feedback_term} IS NULL THEN [] ELSE [1] END |
                 SET m.quality_score = m.quality_score * 0.9 + {feedback_term} * 0.1
             )
             RETURN m.id as id"
        );
        let mut query = Query::new(cypher)
            .param("memory_id", usage.memory_id.as_str())
            .param("instance_id", usage.agent_instance_id.as_str())
            .param("used_at", usage.used_at)
            .param("outcome", usage.outcome.as_str());
        if let Some(feedback) = usage.feedback_score {
            query = query.param("feedback_score", feedback);
        }

        let rows = self.run_write(query).await?;
        Ok(!rows.is_empty())
    }

    async fn record_validation(&self, validation: &ValidationRecord) -> EngramResult<bool> {
        let notes_term = if validation.notes.is_some() {
            "$notes"
        } else {
            "null"
        };
        let cypher = format!(
            "MATCH (m:Memory {{id: $memory_id}})
             MERGE (ai:AgentInstance {{id: $instance_id}})
             CREATE (ai)-[:VALIDATED {{
                 validated_at: $validated_at,
                 outcome: $outcome,
                 feedback_score: $feedback_score,
                 notes: {notes_term}
             }}]->(m)
             SET m.validation_count = m.validation_count + 1,
                 m.last_validated = $validated_at
             WITH m
             MATCH (m)<-[v:VALIDATED]-()
             WITH m, avg(v.feedback_score) as avg_validation_score
             SET m.quality_score = m.confidence * 0.3 + avg_validation_score * 0.7
             RETURN m.id as id"
        );
        let mut query = Query::new(cypher)
            .param("memory_id", validation.memory_id.as_str())
            .param("instance_id", validation.agent_instance_id.as_str())
            .param("validated_at", validation.validated_at)
            .param("outcome", validation.outcome.as_str())
            .param("feedback_score", validation.feedback_score);
        if let Some(notes) = &validation.notes {
            query = query.param("notes", notes.as_str());
        }

        let rows = self.run_write(query).await?;
        Ok(!rows.is_empty())
    }

    async fn relate_memories(&self, first: &str, second: &str) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (a:Memory {id: $first}), (b:Memory {id: $second})
                     WHERE NOT exists((a)-[:RELATED_TO]-(b))
                     CREATE (a)-[:RELATED_TO]->(b)
                     RETURN count(*) as created"
                        .to_string(),
                )
                .param("first", first)
                .param("second", second),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "created")? > 0),
            None => Ok(false),
        }
    }

    async fn agent_type_exists(&self, id: &str) -> EngramResult<bool> {
        let rows = self
            .run_read(
                Query::new(
                    "MATCH (at:AgentType {id: $id}) RETURN count(at) as count".to_string(),
                )
                .param("id", id),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "count")? > 0),
            None => Ok(false),
        }
    }

    async fn memory_stats(&self, agent_type: Option<&str>) -> EngramResult<MemoryStats> {
        let (cypher, bind_agent) = match agent_type {
            Some(_) => (
                "MATCH (at:AgentType {id: $agent_type})-[:HAS_MEMORY]->(m:Memory)
                 RETURN count(m) as total_memories,
                        avg(m.quality_score) as avg_quality,
                        sum(m.application_count) as total_applications,
                        avg(m.success_rate) as avg_success_rate",
                true,
            ),
            None => (
                "MATCH (m:Memory)
                 RETURN count(m) as total_memories,
                        avg(m.quality_score) as avg_quality,
                        sum(m.application_count) as total_applications,
                        avg(m.success_rate) as avg_success_rate",
                false,
            ),
        };
        let mut query = Query::new(cypher.to_string());
        if bind_agent {
            query = query.param("agent_type", agent_type.unwrap_or_default());
        }

        let rows = self.run_read(query).await?;
        match rows.first() {
            Some(row) => Ok(MemoryStats {
                total_memories: req::<i64>(row, "total_memories")? as u64,
                avg_quality: opt::<f64>(row, "avg_quality").unwrap_or(0.0),
                total_applications: opt::<i64>(row, "total_applications").unwrap_or(0) as u64,
                avg_success_rate: opt::<f64>(row, "avg_success_rate").unwrap_or(0.0),
            }),
            None => Ok(MemoryStats::default()),
        }
    }
}

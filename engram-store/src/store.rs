//! Validated memory operations over any graph backend.

use std::sync::Arc;

use uuid::Uuid;

use engram_core::errors::{EngramResult, StoreError};
use engram_core::memory::{
    MemoryDraft, MemoryPatch, MemoryRecord, MemoryScope, MemoryStats, MemoryType, Outcome,
    Score, UsageRecord, ValidationRecord,
};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, MemoryOps};

/// Parameters for [`MemoryStore::create_memory`].
#[derive(Debug, Clone)]
pub struct CreateMemory {
    pub content: String,
    pub agent_type: String,
    pub category: String,
    pub memory_type: MemoryType,
    pub project_id: Option<String>,
    pub metadata: serde_json::Value,
    pub tags: Vec<String>,
    pub quality_score: f64,
    pub confidence: f64,
    pub importance: Option<u8>,
    pub agent_instance_id: Option<String>,
}

impl Default for CreateMemory {
    fn default() -> Self {
        Self {
            content: String::new(),
            agent_type: String::new(),
            category: "general".to_string(),
            memory_type: MemoryType::Procedural,
            project_id: None,
            metadata: serde_json::Value::Object(Default::default()),
            tags: Vec::new(),
            quality_score: 0.5,
            confidence: 0.7,
            importance: None,
            agent_instance_id: None,
        }
    }
}

/// Memory store with agent-type awareness and scope management.
pub struct MemoryStore {
    backend: Arc<dyn GraphBackend>,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn GraphBackend> {
        &self.backend
    }

    /// Create a memory owned by an agent type. Scopes to the project when
    /// one is given, otherwise universally to the agent type.
    pub async fn create_memory(&self, request: CreateMemory) -> EngramResult<String> {
        validate_score("quality_score", request.quality_score)?;
        validate_score("confidence", request.confidence)?;
        if let Some(importance) = request.importance {
            if !(1..=10).contains(&importance) {
                return Err(StoreError::InvalidArgument {
                    message: format!("importance must be in 1..=10, got {importance}"),
                }
                .into());
            }
        }
        if !self.backend.agent_type_exists(&request.agent_type).await? {
            return Err(StoreError::UnknownAgentType {
                id: request.agent_type,
            }
            .into());
        }

        let memory_id = Uuid::new_v4().to_string();
        let scope = match &request.project_id {
            Some(project) => MemoryScope::project(project.clone()),
            None => MemoryScope::universal(request.agent_type.clone()),
        };
        let draft = MemoryDraft {
            id: memory_id.clone(),
            content: request.content,
            agent_type: request.agent_type.clone(),
            category: request.category,
            memory_type: request.memory_type,
            quality_score: request.quality_score,
            confidence: request.confidence,
            importance: request.importance,
            tags: request.tags,
            metadata: serde_json::to_string(&request.metadata)?,
            scope,
            agent_instance_id: request.agent_instance_id,
            created_at: now_ms(),
        };

        self.backend.create_memory(&draft).await?;
        tracing::info!(
            memory_id = %memory_id,
            agent_type = %request.agent_type,
            "created memory"
        );
        Ok(memory_id)
    }

    pub async fn get_memory(&self, memory_id: &str) -> EngramResult<Option<MemoryRecord>> {
        self.backend.get_memory(memory_id).await
    }

    /// Partial update; untouched fields keep their values. Refreshes
    /// `last_validated` whenever anything is applied. Returns false when
    /// no memory matched the id.
    pub async fn update_memory(&self, memory_id: &str, patch: MemoryPatch) -> EngramResult<bool> {
        if let Some(quality) = patch.quality_score {
            validate_score("quality_score", quality)?;
        }
        self.backend
            .update_memory(memory_id, &patch, now_ms())
            .await
            .map_err(|e| {
                tracing::error!(memory_id = %memory_id, error = %e, "failed to update memory");
                e
            })
    }

    /// Detach-delete. Idempotent: deleting a missing memory returns false.
    pub async fn delete_memory(&self, memory_id: &str) -> EngramResult<bool> {
        let deleted = self.backend.delete_memory(memory_id).await?;
        Ok(deleted > 0)
    }

    pub async fn get_memories_by_agent_type(
        &self,
        agent_type: &str,
        project_id: Option<&str>,
        category: Option<&str>,
        min_quality: f64,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        self.backend
            .memories_by_agent_type(agent_type, project_id, category, min_quality, limit)
            .await
    }

    pub async fn search_memories(
        &self,
        query: &str,
        agent_type: Option<&str>,
        project_id: Option<&str>,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        self.backend
            .search_memories(query, agent_type, project_id, limit)
            .await
    }

    pub async fn get_high_quality_memories(
        &self,
        agent_type: &str,
        min_quality: f64,
        min_validations: u32,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        self.backend
            .high_quality_memories(agent_type, min_quality, min_validations, limit)
            .await
    }

    /// Record that an instance applied a memory. Unknown memories are a
    /// no-op returning false.
    pub async fn record_usage(
        &self,
        memory_id: &str,
        agent_instance_id: &str,
        outcome: Outcome,
        feedback_score: Option<f64>,
    ) -> EngramResult<bool> {
        if let Some(feedback) = feedback_score {
            validate_score("feedback_score", feedback)?;
        }
        let usage = UsageRecord {
            memory_id: memory_id.to_string(),
            agent_instance_id: agent_instance_id.to_string(),
            outcome,
            feedback_score,
            used_at: now_ms(),
        };
        let recorded = self.backend.record_usage(&usage).await?;
        if recorded {
            tracing::debug!(memory_id = %memory_id, outcome = %outcome, "recorded usage");
        }
        Ok(recorded)
    }

    /// Record a validation with its feedback score; recomputes the
    /// confidence/validation quality blend.
    pub async fn validate_memory(
        &self,
        memory_id: &str,
        agent_instance_id: &str,
        feedback_score: f64,
        outcome: Outcome,
        notes: Option<String>,
    ) -> EngramResult<bool> {
        validate_score("feedback_score", feedback_score)?;
        let validation = ValidationRecord {
            memory_id: memory_id.to_string(),
            agent_instance_id: agent_instance_id.to_string(),
            outcome,
            feedback_score,
            notes,
            validated_at: now_ms(),
        };
        let recorded = self.backend.record_validation(&validation).await?;
        if recorded {
            tracing::debug!(memory_id = %memory_id, feedback = feedback_score, "recorded validation");
        }
        Ok(recorded)
    }

    /// Create an undirected relation between two memories.
    pub async fn relate_memories(&self, first: &str, second: &str) -> EngramResult<bool> {
        if first == second {
            return Err(StoreError::InvalidArgument {
                message: "cannot relate a memory to itself".to_string(),
            }
            .into());
        }
        self.backend.relate_memories(first, second).await
    }

    pub async fn get_memory_stats(
        &self,
        agent_type: Option<&str>,
    ) -> EngramResult<MemoryStats> {
        self.backend.memory_stats(agent_type).await
    }
}

fn validate_score(name: &str, value: f64) -> EngramResult<()> {
    if Score::checked(value).is_none() {
        return Err(StoreError::InvalidArgument {
            message: format!("{name} must be in [0.0, 1.0], got {value}"),
        }
        .into());
    }
    Ok(())
}

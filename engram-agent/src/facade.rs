//! Agent-type-scoped memory interface with cross-agent learning.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use engram_core::errors::EngramError;
use engram_core::memory::{
    AgentRole, MemoryRecord, MemoryStats, MemoryType, Outcome, ScopeKind,
};
use engram_core::traits::GraphBackend;
use engram_observability::{MetricsCollector, OperationStatus, OperationType};
use engram_store::{CreateMemory, MemoryStore};

/// Environment variable overriding the detected project id.
const PROJECT_ID_VAR: &str = "AMPLIHACK_PROJECT_ID";

/// Parameters for [`AgentMemory::remember`].
#[derive(Debug, Clone)]
pub struct Remember {
    pub content: String,
    pub category: String,
    pub memory_type: MemoryType,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub metadata: serde_json::Value,
    /// Store universally instead of scoped to the current project.
    pub global_scope: bool,
}

impl Default for Remember {
    fn default() -> Self {
        Self {
            content: String::new(),
            category: "general".to_string(),
            memory_type: MemoryType::Procedural,
            tags: Vec::new(),
            confidence: 0.7,
            metadata: serde_json::Value::Object(Default::default()),
            global_scope: false,
        }
    }
}

/// High-level memory interface for one agent.
pub struct AgentMemory {
    agent_type: String,
    project_id: String,
    instance_id: String,
    store: MemoryStore,
    metrics: Option<Arc<MetricsCollector>>,
}

impl AgentMemory {
    /// Build a facade for an agent type. Unknown types warn but work.
    /// The project id resolves explicit → environment → leaf of the
    /// working directory → "default".
    pub fn new(
        agent_type: &str,
        project_id: Option<String>,
        backend: Arc<dyn GraphBackend>,
    ) -> Self {
        let agent_type = AgentRole::parse_lenient(agent_type);
        let project_id = project_id
            .or_else(|| std::env::var(PROJECT_ID_VAR).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(detect_project_id);
        let instance_id = format!("{}_{}", agent_type, &Uuid::new_v4().simple().to_string()[..8]);

        tracing::info!(
            agent_type = %agent_type,
            project_id = %project_id,
            instance_id = %instance_id,
            "initialized agent memory"
        );

        Self {
            agent_type,
            project_id,
            instance_id,
            store: MemoryStore::new(backend),
            metrics: None,
        }
    }

    /// Record per-operation latency and status into a shared collector.
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Store a memory for this agent type. Initial quality is derived
    /// from the stated confidence. Returns None on failure.
    pub async fn remember(&self, request: Remember) -> Option<String> {
        let started = Instant::now();
        let result = self
            .store
            .create_memory(CreateMemory {
                content: request.content,
                agent_type: self.agent_type.clone(),
                category: request.category.clone(),
                memory_type: request.memory_type,
                project_id: (!request.global_scope).then(|| self.project_id.clone()),
                metadata: request.metadata,
                tags: request.tags,
                quality_score: request.confidence * 0.7,
                confidence: request.confidence,
                importance: None,
                agent_instance_id: Some(self.instance_id.clone()),
            })
            .await;

        match result {
            Ok(memory_id) => {
                self.record_metric(OperationType::Write, started, None);
                tracing::info!(
                    memory_id = %memory_id,
                    category = %request.category,
                    scope = if request.global_scope { "global" } else { self.project_id.as_str() },
                    "stored memory"
                );
                Some(memory_id)
            }
            Err(e) => {
                self.record_metric(OperationType::Write, started, Some(&e));
                self.log_degraded("remember", &e);
                None
            }
        }
    }

    /// Retrieve memories for this agent type, sorted by quality. With
    /// `include_global` unset, only project-scoped memories come back.
    pub async fn recall(
        &self,
        category: Option<&str>,
        tags: Option<&[String]>,
        min_quality: f64,
        include_global: bool,
        limit: usize,
    ) -> Vec<MemoryRecord> {
        let started = Instant::now();
        let result = self
            .store
            .get_memories_by_agent_type(
                &self.agent_type,
                Some(&self.project_id),
                category,
                min_quality,
                limit,
            )
            .await;

        let mut memories = match result {
            Ok(memories) => {
                self.record_metric(OperationType::Retrieval, started, None);
                memories
            }
            Err(e) => {
                self.record_metric(OperationType::Retrieval, started, Some(&e));
                self.log_degraded("recall", &e);
                return Vec::new();
            }
        };

        if !include_global {
            memories.retain(|m| {
                m.scope.kind == ScopeKind::Project && m.scope.id == self.project_id
            });
        }
        if let Some(tags) = tags {
            if !tags.is_empty() {
                memories.retain(|m| m.tags.iter().any(|tag| tags.contains(tag)));
            }
        }

        tracing::info!(
            count = memories.len(),
            category = category.unwrap_or("all"),
            min_quality,
            "recalled memories"
        );
        memories
    }

    /// Learn from well-validated, high-quality memories of the same agent
    /// type, optionally narrowed by search topic and category.
    pub async fn learn_from_others(
        &self,
        topic: Option<&str>,
        category: Option<&str>,
        min_quality: f64,
        min_validations: u32,
        limit: usize,
    ) -> Vec<MemoryRecord> {
        let result = match topic {
            Some(topic) => self
                .store
                .search_memories(topic, Some(&self.agent_type), None, limit * 2)
                .await
                .map(|mut memories| {
                    memories.retain(|m| {
                        m.quality_score >= min_quality
                            && m.validation_count >= min_validations
                    });
                    memories.truncate(limit);
                    memories
                }),
            None => {
                self.store
                    .get_high_quality_memories(
                        &self.agent_type,
                        min_quality,
                        min_validations,
                        limit,
                    )
                    .await
            }
        };

        let mut memories = match result {
            Ok(memories) => memories,
            Err(e) => {
                self.log_degraded("learn_from_others", &e);
                return Vec::new();
            }
        };
        if let Some(category) = category {
            memories.retain(|m| m.category == category);
        }

        tracing::info!(
            count = memories.len(),
            topic = topic.unwrap_or("all"),
            "learned from others"
        );
        memories
    }

    /// Record that this instance applied a memory.
    pub async fn apply_memory(
        &self,
        memory_id: &str,
        outcome: Outcome,
        feedback_score: Option<f64>,
    ) -> bool {
        let started = Instant::now();
        match self
            .store
            .record_usage(memory_id, &self.instance_id, outcome, feedback_score)
            .await
        {
            Ok(recorded) => {
                self.record_metric(OperationType::Write, started, None);
                recorded
            }
            Err(e) => {
                self.record_metric(OperationType::Write, started, Some(&e));
                self.log_degraded("apply_memory", &e);
                false
            }
        }
    }

    /// Validate a memory after using it.
    pub async fn validate_memory(
        &self,
        memory_id: &str,
        feedback_score: f64,
        outcome: Outcome,
        notes: Option<String>,
    ) -> bool {
        let started = Instant::now();
        match self
            .store
            .validate_memory(memory_id, &self.instance_id, feedback_score, outcome, notes)
            .await
        {
            Ok(recorded) => {
                self.record_metric(OperationType::Write, started, None);
                recorded
            }
            Err(e) => {
                self.record_metric(OperationType::Write, started, Some(&e));
                self.log_degraded("validate_memory", &e);
                false
            }
        }
    }

    /// Search memories by content and tags.
    pub async fn search(
        &self,
        query: &str,
        include_global: bool,
        limit: usize,
    ) -> Vec<MemoryRecord> {
        let started = Instant::now();
        let project_filter = (!include_global).then_some(self.project_id.as_str());
        match self
            .store
            .search_memories(query, Some(&self.agent_type), project_filter, limit)
            .await
        {
            Ok(memories) => {
                self.record_metric(OperationType::Retrieval, started, None);
                tracing::info!(query = %query, count = memories.len(), "searched memories");
                memories
            }
            Err(e) => {
                self.record_metric(OperationType::Retrieval, started, Some(&e));
                self.log_degraded("search", &e);
                Vec::new()
            }
        }
    }

    /// Memory statistics for this agent type.
    pub async fn get_stats(&self) -> MemoryStats {
        match self.store.get_memory_stats(Some(&self.agent_type)).await {
            Ok(stats) => stats,
            Err(e) => {
                self.log_degraded("get_stats", &e);
                MemoryStats::default()
            }
        }
    }

    /// Highest-quality, well-validated memories.
    pub async fn get_best_practices(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Vec<MemoryRecord> {
        self.learn_from_others(None, category, 0.85, 3, limit).await
    }

    /// Direct access to the store for advanced callers.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    fn record_metric(
        &self,
        operation: OperationType,
        started: Instant,
        error: Option<&EngramError>,
    ) {
        if let Some(metrics) = &self.metrics {
            let status = if error.is_some() {
                OperationStatus::Failure
            } else {
                OperationStatus::Success
            };
            metrics.record(
                operation,
                status,
                started.elapsed().as_secs_f64() * 1000.0,
                error.map(|e| e.to_string()),
                serde_json::json!({ "agent_type": self.agent_type }),
            );
        }
    }

    fn log_degraded(&self, operation: &str, error: &EngramError) {
        tracing::error!(
            operation,
            agent_type = %self.agent_type,
            project_id = %self.project_id,
            error = %error,
            "memory operation degraded"
        );
    }
}

/// Leaf directory of the working tree, or "default".
fn detect_project_id() -> String {
    std::env::current_dir()
        .ok()
        .and_then(|dir| {
            dir.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "default".to_string())
}

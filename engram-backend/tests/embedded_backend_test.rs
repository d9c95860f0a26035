use std::sync::Arc;

use engram_backend::breaker::{BreakerConfig, CircuitBreaker};
use engram_backend::EmbeddedBackend;
use engram_core::errors::{BackendError, EngramError};
use engram_core::memory::{MemoryDraft, MemoryScope, MemoryType};
use engram_core::models::AgentTypeSeed;
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, MemoryOps, SchemaOps};

fn seed() -> Vec<AgentTypeSeed> {
    vec![AgentTypeSeed {
        id: "architect",
        name: "Architect Agent",
        description: "System design and architecture",
    }]
}

fn draft(id: &str, agent_type: &str) -> MemoryDraft {
    MemoryDraft {
        id: id.to_string(),
        content: "use arenas for per-request allocation".to_string(),
        agent_type: agent_type.to_string(),
        category: "design".to_string(),
        memory_type: MemoryType::Procedural,
        quality_score: 0.63,
        confidence: 0.9,
        importance: Some(7),
        tags: vec!["arenas".to_string(), "memory".to_string()],
        metadata: r#"{"file": "src/alloc.rs"}"#.to_string(),
        scope: MemoryScope::project("p1"),
        agent_instance_id: Some("architect_ab12cd34".to_string()),
        created_at: now_ms(),
    }
}

// ── Connectivity and lifecycle ──────────────────────────────────────────

#[tokio::test]
async fn verify_connectivity_on_fresh_store() {
    let backend = EmbeddedBackend::open_in_memory().unwrap();
    assert!(backend.verify_connectivity().await);
}

#[tokio::test]
async fn closed_backend_rejects_operations() {
    let backend = EmbeddedBackend::open_in_memory().unwrap();
    backend.close().await;
    let err = backend.get_memory("missing").await.unwrap_err();
    assert!(matches!(
        err,
        EngramError::Backend(BackendError::NotConnected)
    ));
}

#[tokio::test]
async fn file_backed_store_uses_wal_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let pool =
        engram_backend::embedded::pool::ConnectionPool::open(&path, 2).unwrap();
    let wal = pool
        .with_write(engram_backend::embedded::pragmas::verify_wal_mode)
        .unwrap();
    assert!(wal);
}

#[tokio::test]
async fn file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");

    {
        let backend = EmbeddedBackend::open(&path).unwrap();
        backend.seed_agent_types(&seed(), now_ms()).await.unwrap();
        backend.create_memory(&draft("m1", "architect")).await.unwrap();
        backend.close().await;
    }

    let backend = EmbeddedBackend::open(&path).unwrap();
    let memory = backend.get_memory("m1").await.unwrap().unwrap();
    assert_eq!(memory.content, "use arenas for per-request allocation");
    assert_eq!(memory.tags, vec!["arenas", "memory"]);
}

// ── Record round trip ───────────────────────────────────────────────────

#[tokio::test]
async fn memory_round_trip_preserves_scalar_fields() {
    let backend = EmbeddedBackend::open_in_memory().unwrap();
    backend.seed_agent_types(&seed(), now_ms()).await.unwrap();

    let draft = draft("m1", "architect");
    backend.create_memory(&draft).await.unwrap();
    let memory = backend.get_memory("m1").await.unwrap().unwrap();

    assert_eq!(memory.id, draft.id);
    assert_eq!(memory.content, draft.content);
    assert_eq!(memory.agent_type, draft.agent_type);
    assert_eq!(memory.category, draft.category);
    assert_eq!(memory.memory_type, draft.memory_type);
    assert_eq!(memory.quality_score, draft.quality_score);
    assert_eq!(memory.confidence, draft.confidence);
    assert_eq!(memory.importance, draft.importance);
    assert_eq!(memory.metadata, draft.metadata);
    assert_eq!(memory.created_at, draft.created_at);
    assert_eq!(memory.last_validated, draft.created_at);
    assert_eq!(memory.scope, draft.scope);
    assert_eq!(memory.validation_count, 0);
    assert_eq!(memory.application_count, 0);
    assert_eq!(memory.success_rate, 0.0);
    assert!(!memory.archived);
}

// ── Circuit breaker admission ───────────────────────────────────────────

#[tokio::test]
async fn open_breaker_rejects_before_touching_the_store() {
    let breaker = Arc::new(CircuitBreaker::new(BreakerConfig {
        failure_threshold: 5,
        timeout: std::time::Duration::from_secs(60),
        success_threshold: 2,
    }));
    let backend = EmbeddedBackend::open_in_memory()
        .unwrap()
        .with_breaker(Arc::clone(&breaker));

    for _ in 0..5 {
        breaker.record_failure();
    }

    let err = backend.get_memory("anything").await.unwrap_err();
    assert!(matches!(
        err,
        EngramError::Backend(BackendError::CircuitOpen { .. })
    ));
    assert!(!backend.verify_connectivity().await);
}

use std::sync::Arc;

use engram_agent::{AgentMemory, Remember};
use engram_backend::EmbeddedBackend;
use engram_core::memory::Outcome;
use engram_core::traits::GraphBackend;
use engram_schema::SchemaManager;

async fn backend() -> Arc<dyn GraphBackend> {
    let backend: Arc<dyn GraphBackend> = Arc::new(EmbeddedBackend::open_in_memory().unwrap());
    assert!(SchemaManager::new(Arc::clone(&backend)).initialize_schema().await);
    backend
}

fn agent(backend: &Arc<dyn GraphBackend>, agent_type: &str, project: &str) -> AgentMemory {
    AgentMemory::new(agent_type, Some(project.to_string()), Arc::clone(backend))
}

// ── Construction ────────────────────────────────────────────────────────

#[tokio::test]
async fn instance_id_is_derived_from_the_agent_type() {
    let backend = backend().await;
    let memory = agent(&backend, "architect", "p1");
    assert!(memory.instance_id().starts_with("architect_"));
    assert_eq!(memory.instance_id().len(), "architect_".len() + 8);
    assert_eq!(memory.project_id(), "p1");
}

#[tokio::test]
async fn unknown_agent_type_warns_but_works() {
    let backend = backend().await;
    let memory = agent(&backend, "navigator", "p1");
    assert_eq!(memory.agent_type(), "navigator");
    // Unknown types have no seeded node, so remember degrades to None.
    let stored = memory.remember(Remember::default()).await;
    assert!(stored.is_none());
}

// ── Remember / recall ───────────────────────────────────────────────────

#[tokio::test]
async fn remember_then_recall_round_trip() {
    let backend = backend().await;
    let memory = agent(&backend, "architect", "p1");

    let id = memory
        .remember(Remember {
            content: "use arenas".to_string(),
            category: "design".to_string(),
            tags: vec!["arenas".to_string(), "memory".to_string()],
            confidence: 0.9,
            ..Default::default()
        })
        .await
        .unwrap();

    let recalled = memory.recall(Some("design"), None, 0.0, true, 20).await;
    assert_eq!(recalled.len(), 1);
    assert_eq!(recalled[0].id, id);
    // Initial quality is confidence * 0.7.
    assert!((recalled[0].quality_score - 0.63).abs() < 1e-9);
}

#[tokio::test]
async fn recall_respects_project_boundaries() {
    let backend = backend().await;
    let here = agent(&backend, "architect", "p1");
    let elsewhere = agent(&backend, "architect", "p2");

    here.remember(Remember {
        content: "local".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(here.recall(None, None, 0.0, false, 20).await.len(), 1);
    assert_eq!(elsewhere.recall(None, None, 0.0, false, 20).await.len(), 0);
}

#[tokio::test]
async fn global_memories_are_visible_everywhere_but_not_in_strict_recall() {
    let backend = backend().await;
    let here = agent(&backend, "architect", "p1");
    let elsewhere = agent(&backend, "architect", "p2");

    let id = here
        .remember(Remember {
            content: "universal".to_string(),
            global_scope: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let seen_elsewhere = elsewhere.recall(None, None, 0.0, true, 20).await;
    assert!(seen_elsewhere.iter().any(|m| m.id == id));

    let strict_here = here.recall(None, None, 0.0, false, 20).await;
    assert!(!strict_here.iter().any(|m| m.id == id));
}

#[tokio::test]
async fn recall_post_filters_by_tags() {
    let backend = backend().await;
    let memory = agent(&backend, "architect", "p1");

    memory
        .remember(Remember {
            content: "tagged".to_string(),
            tags: vec!["arenas".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    memory
        .remember(Remember {
            content: "untagged".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let wanted = vec!["arenas".to_string()];
    let recalled = memory.recall(None, Some(&wanted), 0.0, true, 20).await;
    assert_eq!(recalled.len(), 1);
    assert_eq!(recalled[0].content, "tagged");
}

// ── Feedback ────────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_and_validate_update_statistics() {
    let backend = backend().await;
    let memory = agent(&backend, "architect", "p1");
    let id = memory
        .remember(Remember {
            content: "x".to_string(),
            confidence: 0.9,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(memory.apply_memory(&id, Outcome::Successful, Some(0.8)).await);
    assert!(
        memory
            .validate_memory(&id, 1.0, Outcome::Successful, Some("worked".to_string()))
            .await
    );

    let recalled = memory.recall(None, None, 0.0, true, 20).await;
    assert_eq!(recalled[0].application_count, 1);
    assert_eq!(recalled[0].validation_count, 1);
    assert_eq!(recalled[0].success_rate, 1.0);
}

#[tokio::test]
async fn applying_a_missing_memory_returns_false() {
    let backend = backend().await;
    let memory = agent(&backend, "architect", "p1");
    assert!(!memory.apply_memory("missing", Outcome::Successful, None).await);
}

// ── Cross-agent learning ────────────────────────────────────────────────

#[tokio::test]
async fn learn_from_others_requires_quality_and_validations() {
    let backend = backend().await;
    let veteran = agent(&backend, "architect", "p1");
    let student = agent(&backend, "architect", "p2");

    let id = veteran
        .remember(Remember {
            content: "validated wisdom about arenas".to_string(),
            confidence: 0.9,
            ..Default::default()
        })
        .await
        .unwrap();
    // Two validations push quality to the blend and the count to 2.
    veteran
        .validate_memory(&id, 1.0, Outcome::Successful, None)
        .await;
    veteran
        .validate_memory(&id, 0.9, Outcome::Successful, None)
        .await;

    let learned = student
        .learn_from_others(Some("arenas"), None, 0.75, 2, 10)
        .await;
    assert_eq!(learned.len(), 1);
    assert_eq!(learned[0].id, id);

    // A fresh, unvalidated memory does not qualify.
    veteran
        .remember(Remember {
            content: "unproven idea about arenas".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let learned = student
        .learn_from_others(Some("arenas"), None, 0.75, 2, 10)
        .await;
    assert_eq!(learned.len(), 1);
}

#[tokio::test]
async fn stats_and_search_go_through_the_facade() {
    let backend = backend().await;
    let memory = agent(&backend, "architect", "p1");
    memory
        .remember(Remember {
            content: "searchable arenas note".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let stats = memory.get_stats().await;
    assert_eq!(stats.total_memories, 1);

    let found = memory.search("arenas", true, 20).await;
    assert_eq!(found.len(), 1);
}

// ── Metrics ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attached_collector_records_facade_operations() {
    let backend = backend().await;
    let collector = Arc::new(engram_observability::MetricsCollector::default());
    let memory = AgentMemory::new("architect", Some("p1".to_string()), Arc::clone(&backend))
        .with_metrics(Arc::clone(&collector));

    memory
        .remember(Remember {
            content: "measured".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    memory.recall(None, None, 0.0, true, 20).await;

    let writes = collector.statistics(Some(engram_observability::OperationType::Write));
    assert_eq!(writes.count, 1);
    assert_eq!(writes.success_rate, 1.0);
    let retrievals =
        collector.statistics(Some(engram_observability::OperationType::Retrieval));
    assert_eq!(retrievals.count, 1);
}

use std::sync::Arc;
use std::time::Duration;

use engram_backend::EmbeddedBackend;
use engram_core::memory::MemoryType;
use engram_core::traits::GraphBackend;
use engram_retrieval::{
    GraphRetrieval, HybridRetrieval, HybridWeights, IsolationLevel, RetrievalContext,
    SimilarityRetrieval, TemporalRetrieval,
};
use engram_schema::SchemaManager;
use engram_store::{CreateMemory, MemoryStore};

async fn fixture() -> (Arc<dyn GraphBackend>, MemoryStore) {
    let backend: Arc<dyn GraphBackend> = Arc::new(EmbeddedBackend::open_in_memory().unwrap());
    assert!(SchemaManager::new(Arc::clone(&backend)).initialize_schema().await);
    let store = MemoryStore::new(Arc::clone(&backend));
    (backend, store)
}

fn request(content: &str, project: Option<&str>, tags: &[&str], importance: Option<u8>) -> CreateMemory {
    CreateMemory {
        content: content.to_string(),
        agent_type: "architect".to_string(),
        project_id: project.map(str::to_string),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        importance,
        ..Default::default()
    }
}

async fn pause() {
    // Embedded timestamps have millisecond resolution; keep creations
    // strictly ordered.
    tokio::time::sleep(Duration::from_millis(5)).await;
}

// ── Temporal ────────────────────────────────────────────────────────────

#[tokio::test]
async fn temporal_returns_newest_first_with_positional_scores() {
    let (backend, store) = fixture().await;
    let older = store.create_memory(request("older", Some("p1"), &[], None)).await.unwrap();
    pause().await;
    let newer = store.create_memory(request("newer", Some("p1"), &[], None)).await.unwrap();

    let retrieval = TemporalRetrieval::new(backend);
    let hits = retrieval
        .retrieve(&RetrievalContext::new("p1", "architect"), 10)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].memory_id, newer);
    assert_eq!(hits[1].memory_id, older);
    assert_eq!(hits[0].score, 1.0);
    assert_eq!(hits[1].score, 0.5);
}

#[tokio::test]
async fn zero_hour_window_returns_nothing() {
    let (backend, store) = fixture().await;
    store.create_memory(request("x", Some("p1"), &[], None)).await.unwrap();
    pause().await;

    let mut ctx = RetrievalContext::new("p1", "architect");
    ctx.time_window_hours = Some(0);
    let hits = TemporalRetrieval::new(backend).retrieve(&ctx, 10).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn omitted_window_returns_everything() {
    let (backend, store) = fixture().await;
    for i in 0..3 {
        store
            .create_memory(request(&format!("m{i}"), Some("p1"), &[], None))
            .await
            .unwrap();
    }
    pause().await;

    let hits = TemporalRetrieval::new(backend)
        .retrieve(&RetrievalContext::new("p1", "architect"), 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
}

// ── Isolation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn project_isolation_hides_other_projects() {
    let (backend, store) = fixture().await;
    let mine = store.create_memory(request("mine", Some("p1"), &[], None)).await.unwrap();
    let universal = store.create_memory(request("universal", None, &[], None)).await.unwrap();
    let other = store.create_memory(request("other", Some("p2"), &[], None)).await.unwrap();
    pause().await;

    let retrieval = TemporalRetrieval::new(backend);

    let with_global = retrieval
        .retrieve(&RetrievalContext::new("p1", "architect"), 10)
        .await
        .unwrap();
    let ids: Vec<&str> = with_global.iter().map(|h| h.memory_id.as_str()).collect();
    assert!(ids.contains(&mine.as_str()));
    assert!(ids.contains(&universal.as_str()));
    assert!(!ids.contains(&other.as_str()));

    let mut strict = RetrievalContext::new("p1", "architect");
    strict.include_global = false;
    let project_only = retrieval.retrieve(&strict, 10).await.unwrap();
    let ids: Vec<&str> = project_only.iter().map(|h| h.memory_id.as_str()).collect();
    assert_eq!(ids, vec![mine.as_str()]);
}

#[tokio::test]
async fn agent_type_isolation_hides_other_roles() {
    let (backend, store) = fixture().await;
    store.create_memory(request("architect memory", Some("p1"), &[], None)).await.unwrap();
    let mut builder = request("builder memory", Some("p1"), &[], None);
    builder.agent_type = "builder".to_string();
    store.create_memory(builder).await.unwrap();
    pause().await;

    let hits = TemporalRetrieval::new(backend)
        .retrieve(&RetrievalContext::new("p1", "architect"), 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "architect memory");
}

#[tokio::test]
async fn instance_isolation_requires_matching_instance() {
    let (backend, store) = fixture().await;
    let mut mine = request("mine", Some("p1"), &[], None);
    mine.agent_instance_id = Some("architect_11111111".to_string());
    store.create_memory(mine).await.unwrap();
    let mut theirs = request("theirs", Some("p1"), &[], None);
    theirs.agent_instance_id = Some("architect_22222222".to_string());
    store.create_memory(theirs).await.unwrap();
    pause().await;

    let mut ctx = RetrievalContext::new("p1", "architect");
    ctx.isolation_level = IsolationLevel::Instance;
    ctx.agent_instance_id = Some("architect_11111111".to_string());
    let hits = TemporalRetrieval::new(backend).retrieve(&ctx, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "mine");
}

#[tokio::test]
async fn min_importance_boundaries() {
    let (backend, store) = fixture().await;
    for importance in [Some(1), Some(5), Some(10), None] {
        store
            .create_memory(request("m", Some("p1"), &[], importance))
            .await
            .unwrap();
    }
    pause().await;

    let retrieval = TemporalRetrieval::new(backend);

    let mut floor = RetrievalContext::new("p1", "architect");
    floor.min_importance = Some(1);
    // Every memory with importance set, none without.
    assert_eq!(retrieval.retrieve(&floor, 10).await.unwrap().len(), 3);

    let mut ceiling = RetrievalContext::new("p1", "architect");
    ceiling.min_importance = Some(10);
    assert_eq!(retrieval.retrieve(&ceiling, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn memory_type_filter_narrows_results() {
    let (backend, store) = fixture().await;
    let mut episodic = request("episodic", Some("p1"), &[], None);
    episodic.memory_type = MemoryType::Episodic;
    store.create_memory(episodic).await.unwrap();
    store.create_memory(request("procedural", Some("p1"), &[], None)).await.unwrap();
    pause().await;

    let mut ctx = RetrievalContext::new("p1", "architect");
    ctx.memory_types = Some(vec![MemoryType::Episodic]);
    let hits = TemporalRetrieval::new(backend).retrieve(&ctx, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory_type, MemoryType::Episodic);
}

// ── Similarity ──────────────────────────────────────────────────────────

#[tokio::test]
async fn similarity_scores_by_tag_overlap() {
    let (backend, store) = fixture().await;
    let both = store
        .create_memory(request("both", Some("p1"), &["arenas", "memory"], None))
        .await
        .unwrap();
    let one = store
        .create_memory(request("one", Some("p1"), &["memory"], None))
        .await
        .unwrap();
    store
        .create_memory(request("none", Some("p1"), &["unrelated"], None))
        .await
        .unwrap();
    pause().await;

    let tags = vec!["arenas".to_string(), "memory".to_string()];
    let hits = SimilarityRetrieval::new(backend)
        .retrieve(&RetrievalContext::new("p1", "architect"), 10, &tags)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].memory_id, both);
    assert_eq!(hits[0].score, 1.0);
    assert_eq!(hits[1].memory_id, one);
    assert_eq!(hits[1].score, 0.5);
}

#[tokio::test]
async fn similarity_without_tags_is_empty() {
    let (backend, _) = fixture().await;
    let hits = SimilarityRetrieval::new(backend)
        .retrieve(&RetrievalContext::new("p1", "architect"), 10, &[])
        .await
        .unwrap();
    assert!(hits.is_empty());
}

// ── Graph traversal ─────────────────────────────────────────────────────

#[tokio::test]
async fn graph_traversal_walks_two_hops_and_excludes_start() {
    let (backend, store) = fixture().await;
    let start = store.create_memory(request("start", Some("p1"), &[], None)).await.unwrap();
    let near = store.create_memory(request("near", Some("p1"), &[], None)).await.unwrap();
    let far = store.create_memory(request("far", Some("p1"), &[], None)).await.unwrap();
    let unreachable = store
        .create_memory(request("unreachable", Some("p1"), &[], None))
        .await
        .unwrap();
    store.relate_memories(&start, &near).await.unwrap();
    store.relate_memories(&near, &far).await.unwrap();
    pause().await;

    let hits = GraphRetrieval::new(backend)
        .retrieve(&RetrievalContext::new("p1", "architect"), 10, &start)
        .await
        .unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    assert_eq!(ids, vec![near.as_str(), far.as_str()]);
    assert!(!ids.contains(&start.as_str()));
    assert!(!ids.contains(&unreachable.as_str()));
    assert_eq!(hits[0].score, 0.5);
    assert_eq!(hits[1].score, 0.0);
}

// ── Hybrid ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn hybrid_orders_multi_strategy_hits_first() {
    let (backend, store) = fixture().await;
    let everywhere = store
        .create_memory(request("everywhere", Some("p1"), &["arenas"], None))
        .await
        .unwrap();
    pause().await;
    let recent_only = store
        .create_memory(request("recent only", Some("p1"), &["unrelated"], None))
        .await
        .unwrap();
    let related = store
        .create_memory(request("related", Some("p1"), &[], None))
        .await
        .unwrap();
    store.relate_memories(&everywhere, &related).await.unwrap();
    pause().await;

    let tags = vec!["arenas".to_string()];
    let hybrid = HybridRetrieval::new(backend, HybridWeights::default()).unwrap();
    let hits = hybrid
        .retrieve(
            &RetrievalContext::new("p1", "architect"),
            10,
            Some(&tags),
            Some(related.as_str()),
        )
        .await
        .unwrap();

    assert_eq!(hits[0].memory_id, everywhere);
    let ids: Vec<&str> = hits.iter().map(|h| h.memory_id.as_str()).collect();
    assert!(ids.contains(&recent_only.as_str()));
}

#[tokio::test]
async fn hybrid_rejects_bad_weights() {
    let (backend, _) = fixture().await;
    let result = HybridRetrieval::new(
        backend,
        HybridWeights {
            temporal: 0.6,
            similarity: 0.6,
            graph: 0.2,
        },
    );
    assert!(result.is_err());
}

use std::sync::Arc;

use engram_backend::EmbeddedBackend;
use engram_core::memory::MemoryPatch;
use engram_core::traits::GraphBackend;
use engram_consolidation::{Consolidator, ConsolidatorConfig};
use engram_schema::SchemaManager;
use engram_store::{CreateMemory, MemoryStore};

async fn fixture() -> (Arc<dyn GraphBackend>, MemoryStore, Consolidator) {
    let backend: Arc<dyn GraphBackend> = Arc::new(EmbeddedBackend::open_in_memory().unwrap());
    assert!(SchemaManager::new(Arc::clone(&backend)).initialize_schema().await);
    let store = MemoryStore::new(Arc::clone(&backend));
    let consolidator = Consolidator::new(Arc::clone(&backend));
    (backend, store, consolidator)
}

fn request(content: &str, project: &str, tags: &[&str], quality: f64) -> CreateMemory {
    CreateMemory {
        content: content.to_string(),
        agent_type: "architect".to_string(),
        project_id: Some(project.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        quality_score: quality,
        ..Default::default()
    }
}

// ── Quality sweep ───────────────────────────────────────────────────────

#[tokio::test]
async fn quality_sweep_writes_component_scores() {
    let (_, store, consolidator) = fixture().await;
    let id = store
        .create_memory(request("x", "p1", &["a", "b", "c"], 0.5))
        .await
        .unwrap();

    let metrics = consolidator.calculate_quality_scores(Some("p1")).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].memory_id, id);
    assert_eq!(metrics[0].tag_richness, 3);
    // Fresh memory, default importance 5, 3 tags, no relations:
    // 0.3*0 + 0.3*0.5 + 0.2*0.3 + 0.2*0 = 0.21
    assert!((metrics[0].quality_score - 0.21).abs() < 1e-9);

    let updated = consolidator.update_quality_scores(&metrics).await.unwrap();
    assert_eq!(updated, 1);

    let memory = store.get_memory(&id).await.unwrap().unwrap();
    assert!((memory.quality_score - 0.21).abs() < 1e-9);
    assert!(memory.last_quality_update.is_some());
}

// ── Promotion ───────────────────────────────────────────────────────────

#[tokio::test]
async fn promotion_is_idempotent() {
    let (_, store, consolidator) = fixture().await;
    let id = store.create_memory(request("great", "p1", &[], 0.5)).await.unwrap();
    store
        .update_memory(
            &id,
            MemoryPatch {
                quality_score: Some(0.85),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let promoted = consolidator.promote_to_global("p1", None).await.unwrap();
    assert_eq!(promoted, vec![id.clone()]);

    let again = consolidator.promote_to_global("p1", None).await.unwrap();
    assert!(again.is_empty());

    let memory = store.get_memory(&id).await.unwrap().unwrap();
    assert_eq!(memory.promoted_from.as_deref(), Some("p1"));
    assert!(memory.promoted_at.is_some());
}

#[tokio::test]
async fn low_quality_memories_are_not_promoted() {
    let (_, store, consolidator) = fixture().await;
    store.create_memory(request("meh", "p1", &[], 0.5)).await.unwrap();

    let promoted = consolidator.promote_to_global("p1", None).await.unwrap();
    assert!(promoted.is_empty());
}

// ── Decay ───────────────────────────────────────────────────────────────

fn eager_decay(backend: Arc<dyn GraphBackend>) -> Consolidator {
    // A negative age threshold puts the cutoff in the future, so every
    // low-quality, low-access memory qualifies immediately.
    Consolidator::with_config(
        backend,
        ConsolidatorConfig {
            decay_threshold_days: -1,
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn dry_run_matches_the_real_sweep() {
    let (backend, store, _) = fixture().await;
    let consolidator = eager_decay(backend);
    let stale = store.create_memory(request("stale", "p1", &[], 0.2)).await.unwrap();
    store.create_memory(request("good", "p1", &[], 0.9)).await.unwrap();

    let candidates = consolidator.apply_decay(true).await.unwrap();
    assert_eq!(candidates, vec![stale.clone()]);

    // Dry run mutates nothing.
    let memory = store.get_memory(&stale).await.unwrap().unwrap();
    assert!(!memory.archived);

    let decayed = consolidator.apply_decay(false).await.unwrap();
    assert_eq!(decayed, candidates);

    let memory = store.get_memory(&stale).await.unwrap().unwrap();
    assert!(memory.archived);
    assert_eq!(memory.importance, Some(4));
    assert!(memory.decayed_at.is_some());
}

#[tokio::test]
async fn decayed_memories_are_not_candidates_again() {
    let (backend, store, _) = fixture().await;
    let consolidator = eager_decay(backend);
    store.create_memory(request("stale", "p1", &[], 0.2)).await.unwrap();

    assert_eq!(consolidator.apply_decay(false).await.unwrap().len(), 1);
    assert!(consolidator.apply_decay(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn importance_floors_at_one() {
    let (backend, store, _) = fixture().await;
    let consolidator = eager_decay(backend);
    let mut low = request("stale", "p1", &[], 0.2);
    low.importance = Some(1);
    let id = store.create_memory(low).await.unwrap();

    consolidator.apply_decay(false).await.unwrap();
    let memory = store.get_memory(&id).await.unwrap().unwrap();
    assert_eq!(memory.importance, Some(1));
}

// ── Duplicates ──────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_pairs_are_ordered_and_thresholded() {
    let (_, store, consolidator) = fixture().await;
    let a = store
        .create_memory(request("first", "p1", &["arenas", "memory"], 0.5))
        .await
        .unwrap();
    let b = store
        .create_memory(request("second", "p1", &["arenas", "memory"], 0.5))
        .await
        .unwrap();
    store
        .create_memory(request("different", "p1", &["unrelated"], 0.5))
        .await
        .unwrap();

    let pairs = consolidator.detect_duplicates("p1", None).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].first < pairs[0].second);
    assert_eq!(pairs[0].similarity, 1.0);
    let expected = if a < b { (a, b) } else { (b, a) };
    assert_eq!((pairs[0].first.clone(), pairs[0].second.clone()), expected);
}

#[tokio::test]
async fn merge_unions_tags_and_archives_the_merged_memory() {
    let (_, store, consolidator) = fixture().await;
    let keep = store
        .create_memory(request("keep", "p1", &["arenas", "memory"], 0.5))
        .await
        .unwrap();
    let merge = store
        .create_memory(request("merge", "p1", &["memory", "alloc"], 0.5))
        .await
        .unwrap();
    let neighbor = store.create_memory(request("neighbor", "p1", &[], 0.5)).await.unwrap();
    store.relate_memories(&merge, &neighbor).await.unwrap();

    assert!(consolidator.merge_duplicates(&keep, &merge, true).await.unwrap());

    let kept = store.get_memory(&keep).await.unwrap().unwrap();
    assert_eq!(kept.tags, vec!["arenas", "memory", "alloc"]);
    assert!(!kept.archived);

    let merged = store.get_memory(&merge).await.unwrap().unwrap();
    assert!(merged.archived);
    assert_eq!(merged.merged_into.as_deref(), Some(keep.as_str()));
    assert!(merged.merged_at.is_some());

    // Second merge of the same pair is a no-op.
    assert!(!consolidator.merge_duplicates(&keep, &merge, true).await.unwrap());
}

// ── Full sweep ──────────────────────────────────────────────────────────

#[tokio::test]
async fn run_consolidation_reports_summary_counts() {
    let (_, store, consolidator) = fixture().await;
    store
        .create_memory(request("a", "p1", &["arenas", "memory"], 0.5))
        .await
        .unwrap();
    store
        .create_memory(request("b", "p1", &["arenas", "memory"], 0.5))
        .await
        .unwrap();

    let summary = consolidator.run_consolidation("p1").await.unwrap();
    assert_eq!(summary.quality_scores_updated, 2);
    assert_eq!(summary.duplicate_pairs_found, 1);
}

use std::sync::Arc;

use engram_backend::EmbeddedBackend;
use engram_core::models::TrackStatus;
use engram_core::traits::GraphBackend;
use engram_ingest::{CodebaseIdentifier, IngestionTracker};

fn commit(fill: char) -> String {
    std::iter::repeat(fill).take(40).collect()
}

fn backend() -> Arc<dyn GraphBackend> {
    Arc::new(EmbeddedBackend::open_in_memory().unwrap())
}

// ── Fresh repo ingestion ────────────────────────────────────────────────

#[tokio::test]
async fn first_track_creates_the_codebase() {
    let backend = backend();
    let tracker = IngestionTracker::new(Arc::clone(&backend));

    let identity = CodebaseIdentifier::for_remote(
        "https://u:p@x.test/org/repo",
        "main",
        &commit('a'),
        None,
    );
    let result = tracker.track(identity.clone(), None).await;

    assert_eq!(result.status, TrackStatus::New);
    assert_eq!(result.ingestion.ingestion_counter, 1);
    assert!(result.previous_ingestion_id.is_none());
    assert!(result.error.is_none());

    let codebase = tracker
        .codebase_info(&identity.unique_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(codebase.remote_url, "https://x.test/org/repo.git");
    assert_eq!(codebase.branch, "main");
    assert_eq!(codebase.ingestion_count, 1);
}

// ── Supersession ────────────────────────────────────────────────────────

#[tokio::test]
async fn second_track_supersedes_the_first() {
    let backend = backend();
    let tracker = IngestionTracker::new(Arc::clone(&backend));

    let first = CodebaseIdentifier::for_remote(
        "https://x.test/org/repo",
        "main",
        &commit('a'),
        None,
    );
    let first_result = tracker.track(first, None).await;
    assert_eq!(first_result.status, TrackStatus::New);

    let second = CodebaseIdentifier::for_remote(
        "https://x.test/org/repo",
        "main",
        &commit('b'),
        None,
    );
    let second_result = tracker.track(second.clone(), None).await;

    assert_eq!(second_result.status, TrackStatus::Update);
    assert_eq!(second_result.ingestion.ingestion_counter, 2);
    assert_eq!(
        second_result.previous_ingestion_id.as_deref(),
        Some(first_result.ingestion.ingestion_id.as_str())
    );

    let codebase = tracker
        .codebase_info(&second.unique_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(codebase.ingestion_count, 2);
    assert_eq!(codebase.commit_sha, commit('b'));
}

#[tokio::test]
async fn counters_stay_consecutive_across_many_tracks() {
    let backend = backend();
    let tracker = IngestionTracker::new(Arc::clone(&backend));

    let mut unique_key = String::new();
    for fill in ['a', 'b', 'c', 'd'] {
        let identity = CodebaseIdentifier::for_remote(
            "https://x.test/org/repo",
            "main",
            &commit(fill),
            None,
        );
        unique_key = identity.unique_key.clone();
        let result = tracker.track(identity, None).await;
        assert_ne!(result.status, TrackStatus::Error);
    }

    let history = tracker.ingestion_history(&unique_key).await.unwrap();
    let counters: Vec<u32> = history.iter().map(|i| i.ingestion_counter).collect();
    assert_eq!(counters, vec![1, 2, 3, 4]);

    let codebase = tracker.codebase_info(&unique_key).await.unwrap().unwrap();
    assert_eq!(codebase.ingestion_count, 4);
}

#[tokio::test]
async fn different_branches_are_different_codebases() {
    let backend = backend();
    let tracker = IngestionTracker::new(Arc::clone(&backend));

    let main = CodebaseIdentifier::for_remote("https://x.test/r", "main", &commit('a'), None);
    let dev = CodebaseIdentifier::for_remote("https://x.test/r", "develop", &commit('a'), None);
    assert_ne!(main.unique_key, dev.unique_key);

    assert_eq!(tracker.track(main, None).await.status, TrackStatus::New);
    assert_eq!(tracker.track(dev, None).await.status, TrackStatus::New);
}

// ── Error handling ──────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_identity_returns_error_result_not_panic() {
    let backend = backend();
    let tracker = IngestionTracker::new(backend);

    let bad = CodebaseIdentifier::for_remote("https://x.test/r", "main", "short-sha", None);
    let result = tracker.track(bad, None).await;

    assert_eq!(result.status, TrackStatus::Error);
    assert!(result.error.unwrap().contains("commit sha"));
}

use std::sync::Arc;

use engram_backend::EmbeddedBackend;
use engram_core::models::{ExternalDocRecord, ExternalLinkKind, KnowledgeSource};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, KnowledgeOps, SchemaOps};
use engram_ingest::{CodeGraphIngestor, DocGraphIngestor, ExternalKnowledgeManager};

fn backend() -> Arc<dyn GraphBackend> {
    Arc::new(EmbeddedBackend::open_in_memory().unwrap())
}

const BUNDLE: &str = r#"{
    "files": [
        {"path": "src/app.py", "language": "python", "project_id": "p1"},
        {"path": "src/db.py", "language": "python"}
    ],
    "classes": [
        {"id": "class:app.Service", "name": "Service", "file_path": "src/app.py"}
    ],
    "functions": [
        {"id": "fn:app.handle", "name": "handle", "file_path": "src/app.py",
         "class_id": "class:app.Service"},
        {"id": "fn:db.connect", "name": "connect", "file_path": "src/db.py"}
    ],
    "imports": [
        {"source_path": "src/app.py", "target_path": "src/db.py", "symbol": "connect"}
    ],
    "relationships": [
        {"kind": "calls", "source_id": "fn:app.handle", "target_id": "fn:db.connect"}
    ]
}"#;

// ── Code bundles ────────────────────────────────────────────────────────

#[tokio::test]
async fn bundle_ingestion_merges_all_sections() {
    let backend = backend();
    let ingestor = CodeGraphIngestor::new(Arc::clone(&backend));

    let counts = ingestor.ingest_json(BUNDLE).await.unwrap();
    assert_eq!(counts.files, 2);
    assert_eq!(counts.classes, 1);
    assert_eq!(counts.functions, 2);
    assert_eq!(counts.imports, 1);
    assert_eq!(counts.relationships, 1);

    let files = backend.list_code_files().await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].project_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn reingesting_the_same_bundle_creates_no_duplicates() {
    let backend = backend();
    let ingestor = CodeGraphIngestor::new(Arc::clone(&backend));

    ingestor.ingest_json(BUNDLE).await.unwrap();
    ingestor.ingest_json(BUNDLE).await.unwrap();

    assert_eq!(backend.list_code_files().await.unwrap().len(), 2);
    assert_eq!(backend.list_functions().await.unwrap().len(), 2);
}

// ── Documentation ───────────────────────────────────────────────────────

#[tokio::test]
async fn doc_import_links_referenced_code_files() {
    let backend = backend();
    CodeGraphIngestor::new(Arc::clone(&backend))
        .ingest_json(BUNDLE)
        .await
        .unwrap();

    let ingestor = DocGraphIngestor::new(Arc::clone(&backend));
    let content = "\
# Service Design

## Request Handling

The **Service** class routes through `src/app.py` via handle().
";
    let counts = ingestor
        .import_documentation("docs/service.md", content, Some("p1"))
        .await
        .unwrap();

    assert_eq!(counts.doc_files, 1);
    assert_eq!(counts.sections, 2);
    assert!(counts.concepts >= 2);
    assert_eq!(counts.code_refs, 1);

    // Deterministic ids make a re-import a no-op.
    let again = ingestor
        .import_documentation("docs/service.md", content, Some("p1"))
        .await
        .unwrap();
    assert_eq!(again.sections, counts.sections);

    let node_counts = backend.node_counts().await.unwrap();
    assert_eq!(node_counts.get("DocFile"), Some(&1));
    assert_eq!(node_counts.get("Section"), Some(&2));
}

// ── External knowledge ──────────────────────────────────────────────────

fn doc(url: &str, trust: f64, ttl_hours: u32, fetched_at: i64) -> ExternalDocRecord {
    ExternalDocRecord {
        url: url.to_string(),
        title: "Docs".to_string(),
        content: "content".to_string(),
        source: KnowledgeSource::LibraryDocs,
        trust_score: trust,
        ttl_hours,
        fetched_at,
        ..Default::default()
    }
}

#[tokio::test]
async fn external_docs_filter_by_trust_score() {
    let backend = backend();
    backend
        .upsert_external_doc(&doc("https://docs.test/a", 0.9, 0, now_ms()), now_ms())
        .await
        .unwrap();
    backend
        .upsert_external_doc(&doc("https://docs.test/b", 0.4, 0, now_ms()), now_ms())
        .await
        .unwrap();

    let trusted = backend
        .query_external_docs(None, 0.8, 10)
        .await
        .unwrap();
    assert_eq!(trusted.len(), 1);
    assert_eq!(trusted[0].url, "https://docs.test/a");
}

#[tokio::test]
async fn expired_docs_are_cleaned_up() {
    let backend = backend();
    let stale = doc("https://docs.test/old", 0.9, 1, now_ms() - 2 * engram_core::time::HOUR_MS);
    let fresh = doc("https://docs.test/new", 0.9, 1, now_ms());
    backend.upsert_external_doc(&stale, now_ms()).await.unwrap();
    backend.upsert_external_doc(&fresh, now_ms()).await.unwrap();

    let deleted = backend.cleanup_expired_docs(now_ms()).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(backend
        .external_doc("https://docs.test/old")
        .await
        .unwrap()
        .is_none());
    assert!(backend
        .external_doc("https://docs.test/new")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn doc_to_code_links_round_trip() {
    let backend = backend();
    CodeGraphIngestor::new(Arc::clone(&backend))
        .ingest_json(BUNDLE)
        .await
        .unwrap();
    backend
        .upsert_external_doc(&doc("https://docs.test/app", 0.9, 0, now_ms()), now_ms())
        .await
        .unwrap();

    assert!(backend
        .link_doc_to_code("https://docs.test/app", "src/app.py", ExternalLinkKind::Explains)
        .await
        .unwrap());

    let linked = backend.docs_for_code("src/app.py").await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].url, "https://docs.test/app");
}

#[tokio::test]
async fn disk_cache_round_trips_through_the_manager() {
    let backend = backend();
    let dir = tempfile::tempdir().unwrap();
    let manager = ExternalKnowledgeManager::new(backend, dir.path()).unwrap();

    let path = manager.cache_path("https://docs.test/a");
    assert!(path.starts_with(dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
    // Same URL, same file; different URL, different file.
    assert_eq!(path, manager.cache_path("https://docs.test/a"));
    assert_ne!(path, manager.cache_path("https://docs.test/b"));
}

// ── Memory linking ──────────────────────────────────────────────────────

#[tokio::test]
async fn linker_attaches_memories_to_files_and_functions() {
    let backend = backend();
    CodeGraphIngestor::new(Arc::clone(&backend))
        .ingest_json(BUNDLE)
        .await
        .unwrap();

    let draft = engram_core::memory::MemoryDraft {
        id: "m1".to_string(),
        content: "always connect before you handle requests".to_string(),
        agent_type: "architect".to_string(),
        category: "general".to_string(),
        memory_type: engram_core::memory::MemoryType::Procedural,
        quality_score: 0.5,
        confidence: 0.7,
        importance: None,
        tags: Vec::new(),
        metadata: r#"{"file": "src/app.py"}"#.to_string(),
        scope: engram_core::memory::MemoryScope::project("p1"),
        agent_instance_id: None,
        created_at: now_ms(),
    };
    engram_core::traits::MemoryOps::create_memory(backend.as_ref(), &draft)
        .await
        .unwrap();
    let record = engram_core::traits::MemoryOps::get_memory(backend.as_ref(), "m1")
        .await
        .unwrap()
        .unwrap();

    let linker = engram_ingest::KnowledgeLinker::new(Arc::clone(&backend));
    let created = linker.link_memory(&record).await.unwrap();
    // One file link from metadata, two function links from content.
    assert_eq!(created, 3);

    // The sweep is idempotent.
    assert_eq!(linker.link_memory(&record).await.unwrap(), 0);
}

use std::sync::Arc;

use engram_backend::EmbeddedBackend;
use engram_core::traits::{GraphBackend, SchemaOps};
use engram_schema::SchemaManager;

async fn initialized_manager() -> (SchemaManager, Arc<dyn GraphBackend>) {
    let backend: Arc<dyn GraphBackend> = Arc::new(EmbeddedBackend::open_in_memory().unwrap());
    let manager = SchemaManager::new(Arc::clone(&backend));
    assert!(manager.initialize_schema().await);
    (manager, backend)
}

#[tokio::test]
async fn initialization_seeds_fourteen_agent_types() {
    let (_, backend) = initialized_manager().await;
    assert_eq!(backend.agent_type_count().await.unwrap(), 14);
}

#[tokio::test]
async fn verification_passes_after_initialization() {
    let (manager, _) = initialized_manager().await;
    assert!(manager.verify_schema().await.unwrap());
}

#[tokio::test]
async fn reinitialization_is_a_no_op() {
    let (manager, backend) = initialized_manager().await;

    let constraints_before = backend.list_constraints().await.unwrap();
    let indexes_before = backend.list_indexes().await.unwrap();
    let seeds_before = backend.agent_type_count().await.unwrap();

    assert!(manager.initialize_schema().await);

    assert_eq!(backend.list_constraints().await.unwrap(), constraints_before);
    assert_eq!(backend.list_indexes().await.unwrap(), indexes_before);
    assert_eq!(backend.agent_type_count().await.unwrap(), seeds_before);
}

#[tokio::test]
async fn status_reports_constraints_indexes_and_counts() {
    let (manager, _) = initialized_manager().await;
    let status = manager.schema_status().await.unwrap();

    assert!(status.constraints.iter().any(|name| name == "memory_id"));
    assert!(status
        .constraints
        .iter()
        .any(|name| name == "code_index_metadata_project_root"));
    assert!(status.indexes.iter().any(|name| name == "memory_created_at"));
    assert_eq!(status.node_counts.get("AgentType"), Some(&14));
    // The code-index placeholder row exists from initialization.
    assert_eq!(status.node_counts.get("CodeIndexMetadata"), Some(&1));
}

#[tokio::test]
async fn verification_fails_on_uninitialized_store() {
    let backend: Arc<dyn GraphBackend> = Arc::new(EmbeddedBackend::open_in_memory().unwrap());
    let manager = SchemaManager::new(backend);
    assert!(manager.verify_schema().await.is_err());
}

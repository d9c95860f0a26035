//! Backend seam traits. Domain crates depend on these; the embedded and
//! remote backends implement them.

mod admin_ops;
mod backend;
mod consolidation_ops;
mod container;
mod ingestion_ops;
mod knowledge_ops;
mod memory_ops;
mod retrieval_ops;
mod schema_ops;

pub use admin_ops::AdminOps;
pub use backend::GraphBackend;
pub use consolidation_ops::ConsolidationOps;
pub use container::ContainerControl;
pub use ingestion_ops::IngestionOps;
pub use knowledge_ops::KnowledgeOps;
pub use memory_ops::MemoryOps;
pub use retrieval_ops::RetrievalOps;
pub use schema_ops::SchemaOps;

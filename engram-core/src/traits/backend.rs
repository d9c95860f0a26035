use async_trait::async_trait;

use crate::config::BackendKind;
use crate::models::BreakerSnapshot;

use super::{
    AdminOps, ConsolidationOps, IngestionOps, KnowledgeOps, MemoryOps, RetrievalOps, SchemaOps,
};

/// The full backend surface. One implementation per storage engine; all
/// operations participate in the shared retry/circuit-breaker layer.
#[async_trait]
pub trait GraphBackend:
    SchemaOps
    + MemoryOps
    + RetrievalOps
    + ConsolidationOps
    + IngestionOps
    + KnowledgeOps
    + AdminOps
    + Send
    + Sync
{
    fn kind(&self) -> BackendKind;

    /// Cheap end-to-end probe; false on any failure.
    async fn verify_connectivity(&self) -> bool;

    /// Snapshot of the backend's circuit breaker.
    fn circuit_state(&self) -> BreakerSnapshot;

    /// Release connections. Further calls fail with `NotConnected`.
    async fn close(&self);
}

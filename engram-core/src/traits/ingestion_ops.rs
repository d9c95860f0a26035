use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{CodebaseIdentity, CodebaseRecord, IngestionRecord};

/// Codebase identity and ingestion-history operations.
#[async_trait]
pub trait IngestionOps {
    async fn find_codebase(&self, unique_key: &str) -> EngramResult<Option<CodebaseRecord>>;

    /// The ingestion with the highest counter for a codebase.
    async fn latest_ingestion(&self, unique_key: &str)
        -> EngramResult<Option<IngestionRecord>>;

    /// Create a codebase with its first ingestion in one transaction.
    async fn create_codebase(
        &self,
        identity: &CodebaseIdentity,
        ingestion: &IngestionRecord,
        now_ms: i64,
    ) -> EngramResult<()>;

    /// Append an ingestion to an existing codebase in one transaction:
    /// bump the count, refresh the commit, and link the supersession edge
    /// from `previous_id`.
    async fn append_ingestion(
        &self,
        identity: &CodebaseIdentity,
        ingestion: &IngestionRecord,
        previous_id: &str,
        now_ms: i64,
    ) -> EngramResult<()>;

    /// Full ingestion chain in counter order.
    async fn ingestion_history(&self, unique_key: &str) -> EngramResult<Vec<IngestionRecord>>;
}

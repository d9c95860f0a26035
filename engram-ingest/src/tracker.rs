//! Ingestion tracking: same unique key → UPDATE (next counter, new
//! supersession link), unseen key → NEW. The high-level API never
//! throws; failures come back as an ERROR result.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use engram_core::errors::{EngramResult, IngestionError};
use engram_core::models::{
    CodebaseIdentity, CodebaseRecord, IngestionRecord, TrackResult, TrackStatus,
};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, IngestionOps};

use crate::identity::CodebaseIdentifier;

pub struct IngestionTracker {
    backend: Arc<dyn GraphBackend>,
}

impl IngestionTracker {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Track one ingestion of the identified codebase. Every failure maps
    /// to a `TrackStatus::Error` result carrying the message.
    pub async fn track(
        &self,
        identity: CodebaseIdentity,
        metadata: Option<BTreeMap<String, String>>,
    ) -> TrackResult {
        match self.track_inner(&identity, metadata.unwrap_or_default()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, unique_key = %identity.unique_key, "ingestion tracking failed");
                TrackResult {
                    status: TrackStatus::Error,
                    ingestion: IngestionRecord {
                        ingestion_id: Uuid::new_v4().to_string(),
                        timestamp: now_ms(),
                        commit_sha: identity.commit_sha.clone(),
                        ingestion_counter: 1,
                        metadata: BTreeMap::new(),
                    },
                    identity,
                    previous_ingestion_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn track_inner(
        &self,
        identity: &CodebaseIdentity,
        metadata: BTreeMap<String, String>,
    ) -> EngramResult<TrackResult> {
        CodebaseIdentifier::validate(identity)?;

        let latest = self
            .backend
            .latest_ingestion(&identity.unique_key)
            .await
            .map_err(wrap)?;

        let now = now_ms();
        match latest {
            None => {
                let ingestion = IngestionRecord {
                    ingestion_id: Uuid::new_v4().to_string(),
                    timestamp: now,
                    commit_sha: identity.commit_sha.clone(),
                    ingestion_counter: 1,
                    metadata,
                };
                self.backend
                    .create_codebase(identity, &ingestion, now)
                    .await
                    .map_err(wrap)?;
                tracing::info!(
                    unique_key = %identity.unique_key,
                    "tracked new codebase"
                );
                Ok(TrackResult {
                    status: TrackStatus::New,
                    identity: identity.clone(),
                    ingestion,
                    previous_ingestion_id: None,
                    error: None,
                })
            }
            Some(previous) => {
                let ingestion = IngestionRecord {
                    ingestion_id: Uuid::new_v4().to_string(),
                    timestamp: now,
                    commit_sha: identity.commit_sha.clone(),
                    ingestion_counter: previous.ingestion_counter + 1,
                    metadata,
                };
                self.backend
                    .append_ingestion(identity, &ingestion, &previous.ingestion_id, now)
                    .await
                    .map_err(wrap)?;
                tracing::info!(
                    unique_key = %identity.unique_key,
                    counter = ingestion.ingestion_counter,
                    "tracked codebase update"
                );
                Ok(TrackResult {
                    status: TrackStatus::Update,
                    identity: identity.clone(),
                    ingestion,
                    previous_ingestion_id: Some(previous.ingestion_id),
                    error: None,
                })
            }
        }
    }

    /// Chronological ingestion chain for a codebase.
    pub async fn ingestion_history(
        &self,
        unique_key: &str,
    ) -> EngramResult<Vec<IngestionRecord>> {
        self.backend.ingestion_history(unique_key).await
    }

    /// The codebase node, if tracked before.
    pub async fn codebase_info(&self, unique_key: &str) -> EngramResult<Option<CodebaseRecord>> {
        self.backend.find_codebase(unique_key).await
    }
}

fn wrap(e: engram_core::errors::EngramError) -> engram_core::errors::EngramError {
    IngestionError::Tracking {
        message: e.to_string(),
    }
    .into()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable identity of a codebase, derived from git metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseIdentity {
    /// Normalized remote URL: credentials stripped, `.git` suffix present.
    pub remote_url: String,
    pub branch: String,
    /// 40-hex git commit SHA.
    pub commit_sha: String,
    /// SHA-256 hex of `remote_url#branch`.
    pub unique_key: String,
    pub metadata: BTreeMap<String, String>,
}

/// A persisted codebase node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseRecord {
    pub unique_key: String,
    pub remote_url: String,
    pub branch: String,
    pub commit_sha: String,
    pub ingestion_count: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One ingestion of a codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub ingestion_id: String,
    pub timestamp: i64,
    pub commit_sha: String,
    /// Monotonic per-codebase counter, starting at 1.
    pub ingestion_counter: u32,
    pub metadata: BTreeMap<String, String>,
}

/// Outcome classification of a tracking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    New,
    Update,
    Error,
}

/// Result of tracking an ingestion. The high-level API returns this for
/// every call; failures carry `status = Error` plus a message instead of
/// propagating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResult {
    pub status: TrackStatus,
    pub identity: CodebaseIdentity,
    pub ingestion: IngestionRecord,
    pub previous_ingestion_id: Option<String>,
    pub error: Option<String>,
}

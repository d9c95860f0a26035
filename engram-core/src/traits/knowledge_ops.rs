use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{
    ApiReferenceRecord, CodeBundle, CodeFileRecord, CodeIngestCounts, DocIngestCounts,
    ExternalDocRecord, ExternalLinkKind, FunctionRecord, ParsedDoc,
};

/// Code, documentation, and external-knowledge subgraph operations.
/// All merges are upserts on the natural key, so re-ingestion is a no-op.
#[async_trait]
pub trait KnowledgeOps {
    /// Merge a code bundle: files, classes, functions, imports, and
    /// relationships.
    async fn merge_code_bundle(
        &self,
        bundle: &CodeBundle,
        now_ms: i64,
    ) -> EngramResult<CodeIngestCounts>;

    /// Merge a parsed markdown document with its sections, concepts, and
    /// code references. Code references link to `CodeFile`s whose path
    /// contains the referenced path.
    async fn merge_doc_file(
        &self,
        doc: &ParsedDoc,
        project_id: Option<&str>,
        now_ms: i64,
    ) -> EngramResult<DocIngestCounts>;

    /// Upsert an external document by URL.
    async fn upsert_external_doc(&self, doc: &ExternalDocRecord, now_ms: i64)
        -> EngramResult<bool>;

    /// Link an external doc to a code file.
    async fn link_doc_to_code(
        &self,
        doc_url: &str,
        code_path: &str,
        kind: ExternalLinkKind,
    ) -> EngramResult<bool>;

    /// Link an external doc to a function.
    async fn link_doc_to_function(&self, doc_url: &str, function_id: &str) -> EngramResult<bool>;

    /// Record that a memory was sourced from an external doc.
    async fn link_memory_source(&self, memory_id: &str, doc_url: &str) -> EngramResult<bool>;

    /// Link a memory to a code file it concerns.
    async fn link_memory_to_file(&self, memory_id: &str, code_path: &str) -> EngramResult<bool>;

    /// Link a memory to a function it concerns.
    async fn link_memory_to_function(
        &self,
        memory_id: &str,
        function_id: &str,
    ) -> EngramResult<bool>;

    /// Link a memory to a documentation file.
    async fn link_memory_to_doc(&self, memory_id: &str, doc_path: &str) -> EngramResult<bool>;

    /// Upsert an API reference entry by id.
    async fn upsert_api_reference(&self, reference: &ApiReferenceRecord) -> EngramResult<bool>;

    /// External docs above a trust floor, optionally restricted to one
    /// source, sorted by trust desc then fetch time desc.
    async fn query_external_docs(
        &self,
        source: Option<crate::models::KnowledgeSource>,
        min_trust_score: f64,
        limit: usize,
    ) -> EngramResult<Vec<ExternalDocRecord>>;

    async fn external_doc(&self, url: &str) -> EngramResult<Option<ExternalDocRecord>>;

    /// External docs linked to a code file.
    async fn docs_for_code(&self, code_path: &str) -> EngramResult<Vec<ExternalDocRecord>>;

    /// Delete external docs whose TTL has expired; returns the count.
    async fn cleanup_expired_docs(&self, now_ms: i64) -> EngramResult<u64>;

    /// All known code files (for linking sweeps).
    async fn list_code_files(&self) -> EngramResult<Vec<CodeFileRecord>>;

    /// All known functions (for linking sweeps).
    async fn list_functions(&self) -> EngramResult<Vec<FunctionRecord>>;
}

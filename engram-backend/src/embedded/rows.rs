//! Row-to-record parsing shared by the embedded query modules.

use rusqlite::Row;

use engram_core::errors::EngramResult;
use engram_core::memory::{MemoryRecord, MemoryScope, MemoryType, ScopeKind};
use engram_core::models::{ExternalDocRecord, KnowledgeSource, MemoryCandidate};

use super::to_query_err;

/// Column list for full memory reads; order must match
/// [`row_to_memory`]. `{p}` is the table alias prefix.
pub fn memory_columns(prefix: &str) -> String {
    [
        "id",
        "content",
        "agent_type",
        "category",
        "memory_type",
        "quality_score",
        "confidence",
        "importance",
        "validation_count",
        "application_count",
        "success_rate",
        "access_count",
        "tags",
        "metadata",
        "created_at",
        "last_validated",
        "accessed_at",
        "last_used",
        "expires_at",
        "parent_id",
        "agent_instance_id",
        "scope_kind",
        "scope_id",
        "archived",
        "promoted_at",
        "promoted_from",
        "decayed_at",
        "merged_into",
        "merged_at",
        "last_quality_update",
    ]
    .map(|c| format!("{prefix}.{c}"))
    .join(", ")
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn parse_scope_kind(raw: &str) -> ScopeKind {
    match raw {
        "project" => ScopeKind::Project,
        _ => ScopeKind::AgentType,
    }
}

pub fn scope_kind_str(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Project => "project",
        ScopeKind::AgentType => "agent_type",
    }
}

/// Parse a full memory row in [`memory_columns`] order.
pub fn row_to_memory(row: &Row<'_>) -> EngramResult<MemoryRecord> {
    let memory_type_raw: String = row.get(4).map_err(to_query_err)?;
    let tags_raw: String = row.get(12).map_err(to_query_err)?;
    let scope_kind_raw: String = row.get(21).map_err(to_query_err)?;

    Ok(MemoryRecord {
        id: row.get(0).map_err(to_query_err)?,
        content: row.get(1).map_err(to_query_err)?,
        agent_type: row.get(2).map_err(to_query_err)?,
        category: row.get(3).map_err(to_query_err)?,
        memory_type: MemoryType::parse(&memory_type_raw)?,
        quality_score: row.get(5).map_err(to_query_err)?,
        confidence: row.get(6).map_err(to_query_err)?,
        importance: row.get::<_, Option<i64>>(7).map_err(to_query_err)?.map(|v| v as u8),
        validation_count: row.get::<_, i64>(8).map_err(to_query_err)? as u32,
        application_count: row.get::<_, i64>(9).map_err(to_query_err)? as u32,
        success_rate: row.get(10).map_err(to_query_err)?,
        access_count: row.get::<_, i64>(11).map_err(to_query_err)? as u32,
        tags: parse_tags(&tags_raw),
        metadata: row.get(13).map_err(to_query_err)?,
        created_at: row.get(14).map_err(to_query_err)?,
        last_validated: row.get(15).map_err(to_query_err)?,
        accessed_at: row.get(16).map_err(to_query_err)?,
        last_used: row.get(17).map_err(to_query_err)?,
        expires_at: row.get(18).map_err(to_query_err)?,
        parent_id: row.get(19).map_err(to_query_err)?,
        agent_instance_id: row.get(20).map_err(to_query_err)?,
        scope: MemoryScope {
            kind: parse_scope_kind(&scope_kind_raw),
            id: row.get(22).map_err(to_query_err)?,
        },
        archived: row.get::<_, i64>(23).map_err(to_query_err)? != 0,
        promoted_at: row.get(24).map_err(to_query_err)?,
        promoted_from: row.get(25).map_err(to_query_err)?,
        decayed_at: row.get(26).map_err(to_query_err)?,
        merged_into: row.get(27).map_err(to_query_err)?,
        merged_at: row.get(28).map_err(to_query_err)?,
        last_quality_update: row.get(29).map_err(to_query_err)?,
    })
}

/// Column list for retrieval candidates; order must match
/// [`row_to_candidate`].
pub fn candidate_columns(prefix: &str) -> String {
    [
        "id",
        "content",
        "memory_type",
        "created_at",
        "importance",
        "tags",
        "metadata",
    ]
    .map(|c| format!("{prefix}.{c}"))
    .join(", ")
}

/// Parse a candidate row in [`candidate_columns`] order.
pub fn row_to_candidate(row: &Row<'_>) -> EngramResult<MemoryCandidate> {
    let memory_type_raw: String = row.get(2).map_err(to_query_err)?;
    let tags_raw: String = row.get(5).map_err(to_query_err)?;

    Ok(MemoryCandidate {
        memory_id: row.get(0).map_err(to_query_err)?,
        content: row.get(1).map_err(to_query_err)?,
        memory_type: MemoryType::parse(&memory_type_raw)?,
        created_at: row.get(3).map_err(to_query_err)?,
        importance: row.get::<_, Option<i64>>(4).map_err(to_query_err)?.map(|v| v as u8),
        tags: parse_tags(&tags_raw),
        metadata: row.get(6).map_err(to_query_err)?,
    })
}

/// Column list for external docs; order must match [`row_to_external_doc`].
pub const EXTERNAL_DOC_COLUMNS: &str =
    "url, title, content, source, version, trust_score, metadata, fetched_at, ttl_hours";

/// Parse an external doc row in [`EXTERNAL_DOC_COLUMNS`] order.
pub fn row_to_external_doc(row: &Row<'_>) -> EngramResult<ExternalDocRecord> {
    let source_raw: String = row.get(3).map_err(to_query_err)?;
    Ok(ExternalDocRecord {
        url: row.get(0).map_err(to_query_err)?,
        title: row.get(1).map_err(to_query_err)?,
        content: row.get(2).map_err(to_query_err)?,
        source: KnowledgeSource::parse(&source_raw).unwrap_or(KnowledgeSource::Custom),
        version: row.get(4).map_err(to_query_err)?,
        trust_score: row.get(5).map_err(to_query_err)?,
        metadata: row.get(6).map_err(to_query_err)?,
        fetched_at: row.get(7).map_err(to_query_err)?,
        ttl_hours: row.get::<_, i64>(8).map_err(to_query_err)? as u32,
    })
}

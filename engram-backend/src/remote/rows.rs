//! Row extraction helpers shared by the remote query modules.

use neo4rs::Row;
use serde::de::DeserializeOwned;

use engram_core::errors::{BackendError, EngramError, EngramResult};
use engram_core::memory::{MemoryRecord, MemoryScope, MemoryType, ScopeKind};
use engram_core::models::{ExternalDocRecord, KnowledgeSource, MemoryCandidate};

/// Required column; a missing or mistyped value is a query error.
pub fn req<T: DeserializeOwned>(row: &Row, key: &str) -> EngramResult<T> {
    row.get::<T>(key).map_err(|e| {
        EngramError::from(BackendError::Query {
            message: format!("column {key}: {e}"),
        })
    })
}

/// Optional column; null or absent becomes None.
pub fn opt<T: DeserializeOwned>(row: &Row, key: &str) -> Option<T> {
    row.get::<Option<T>>(key).ok().flatten()
}

/// The scalar columns every full memory query must RETURN, in one place
/// so queries and parsing stay in sync.
pub const MEMORY_RETURN: &str = "m.id as id, m.content as content, at.id as agent_type, \
     m.category as category, m.memory_type as memory_type, \
     m.quality_score as quality_score, m.confidence as confidence, \
     m.importance as importance, m.validation_count as validation_count, \
     m.application_count as application_count, m.success_rate as success_rate, \
     m.access_count as access_count, m.tags as tags, m.metadata as metadata, \
     m.created_at as created_at, m.last_validated as last_validated, \
     m.accessed_at as accessed_at, m.last_used as last_used, \
     m.expires_at as expires_at, m.parent_id as parent_id, \
     m.agent_instance_id as agent_instance_id, \
     labels(scope)[0] as scope_label, scope.id as scope_id, \
     (m:Archived) as archived, m.promoted_at as promoted_at, \
     m.promoted_from as promoted_from, m.decayed_at as decayed_at, \
     m.merged_into as merged_into, m.merged_at as merged_at, \
     m.last_quality_update as last_quality_update";

pub fn row_to_memory(row: &Row) -> EngramResult<MemoryRecord> {
    let memory_type_raw: String = req(row, "memory_type")?;
    let scope_label: String = opt::<String>(row, "scope_label").unwrap_or_default();
    let scope_kind = if scope_label == "Project" {
        ScopeKind::Project
    } else {
        ScopeKind::AgentType
    };

    Ok(MemoryRecord {
        id: req(row, "id")?,
        content: req(row, "content")?,
        agent_type: opt(row, "agent_type").unwrap_or_default(),
        category: req(row, "category")?,
        memory_type: MemoryType::parse(&memory_type_raw)?,
        quality_score: req(row, "quality_score")?,
        confidence: req(row, "confidence")?,
        importance: opt::<i64>(row, "importance").map(|v| v as u8),
        validation_count: req::<i64>(row, "validation_count")? as u32,
        application_count: req::<i64>(row, "application_count")? as u32,
        success_rate: req(row, "success_rate")?,
        access_count: opt::<i64>(row, "access_count").unwrap_or(0) as u32,
        tags: opt(row, "tags").unwrap_or_default(),
        metadata: opt(row, "metadata").unwrap_or_else(|| "{}".to_string()),
        created_at: req(row, "created_at")?,
        last_validated: req(row, "last_validated")?,
        accessed_at: opt(row, "accessed_at"),
        last_used: opt(row, "last_used"),
        expires_at: opt(row, "expires_at"),
        parent_id: opt(row, "parent_id"),
        agent_instance_id: opt(row, "agent_instance_id"),
        scope: MemoryScope {
            kind: scope_kind,
            id: opt(row, "scope_id").unwrap_or_default(),
        },
        archived: opt::<bool>(row, "archived").unwrap_or(false),
        promoted_at: opt(row, "promoted_at"),
        promoted_from: opt(row, "promoted_from"),
        decayed_at: opt(row, "decayed_at"),
        merged_into: opt(row, "merged_into"),
        merged_at: opt(row, "merged_at"),
        last_quality_update: opt(row, "last_quality_update"),
    })
}

/// The scalar columns candidate queries must RETURN.
pub const CANDIDATE_RETURN: &str = "m.id as id, m.content as content, \
     m.memory_type as memory_type, m.created_at as created_at, \
     m.importance as importance, m.tags as tags, m.metadata as metadata";

pub fn row_to_candidate(row: &Row) -> EngramResult<MemoryCandidate> {
    let memory_type_raw: String = req(row, "memory_type")?;
    Ok(MemoryCandidate {
        memory_id: req(row, "id")?,
        content: req(row, "content")?,
        memory_type: MemoryType::parse(&memory_type_raw)?,
        created_at: req(row, "created_at")?,
        importance: opt::<i64>(row, "importance").map(|v| v as u8),
        tags: opt(row, "tags").unwrap_or_default(),
        metadata: opt(row, "metadata").unwrap_or_else(|| "{}".to_string()),
    })
}

/// The scalar columns external-doc queries must RETURN.
pub const EXTERNAL_DOC_RETURN: &str = "ed.url as url, ed.title as title, \
     ed.content as content, ed.source as source, ed.version as version, \
     ed.trust_score as trust_score, ed.metadata as metadata, \
     ed.fetched_at as fetched_at, ed.ttl_hours as ttl_hours";

pub fn row_to_external_doc(row: &Row) -> EngramResult<ExternalDocRecord> {
    let source_raw: String = req(row, "source")?;
    Ok(ExternalDocRecord {
        url: req(row, "url")?,
        title: req(row, "title")?,
        content: req(row, "content")?,
        source: KnowledgeSource::parse(&source_raw).unwrap_or(KnowledgeSource::Custom),
        version: req(row, "version")?,
        trust_score: req(row, "trust_score")?,
        metadata: opt(row, "metadata").unwrap_or_else(|| "{}".to_string()),
        fetched_at: req(row, "fetched_at")?,
        ttl_hours: req::<i64>(row, "ttl_hours")? as u32,
    })
}

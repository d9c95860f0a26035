//! Relational rendering of the property graph. Exactly-one edges become
//! columns; many-to-many edges become join tables. All statements are
//! idempotent.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use super::to_query_err;

/// Create every table the embedded backend needs.
pub fn run_migrations(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS agent_types (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            path TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS agent_instances (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            agent_type TEXT NOT NULL,
            category TEXT NOT NULL,
            memory_type TEXT NOT NULL,
            quality_score REAL NOT NULL,
            confidence REAL NOT NULL,
            importance INTEGER,
            validation_count INTEGER NOT NULL DEFAULT 0,
            application_count INTEGER NOT NULL DEFAULT 0,
            success_rate REAL NOT NULL DEFAULT 0,
            access_count INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL,
            metadata TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            last_validated INTEGER NOT NULL,
            accessed_at INTEGER,
            last_used INTEGER,
            expires_at INTEGER,
            parent_id TEXT,
            agent_instance_id TEXT,
            scope_kind TEXT NOT NULL,
            scope_id TEXT NOT NULL,
            archived INTEGER NOT NULL DEFAULT 0,
            promoted_at INTEGER,
            promoted_from TEXT,
            decayed_at INTEGER,
            merged_into TEXT,
            merged_at INTEGER,
            last_quality_update INTEGER
        );

        CREATE TABLE IF NOT EXISTS memory_relations (
            source_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            PRIMARY KEY (source_id, target_id)
        );

        CREATE TABLE IF NOT EXISTS memory_usage (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            memory_id TEXT NOT NULL,
            instance_id TEXT NOT NULL,
            used_at INTEGER NOT NULL,
            outcome TEXT NOT NULL,
            feedback_score REAL
        );

        CREATE TABLE IF NOT EXISTS memory_validations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            memory_id TEXT NOT NULL,
            instance_id TEXT NOT NULL,
            validated_at INTEGER NOT NULL,
            outcome TEXT NOT NULL,
            feedback_score REAL NOT NULL,
            notes TEXT
        );

        CREATE TABLE IF NOT EXISTS memory_promotions (
            memory_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            promoted_at INTEGER NOT NULL,
            PRIMARY KEY (memory_id, project_id)
        );

        CREATE TABLE IF NOT EXISTS codebases (
            unique_key TEXT PRIMARY KEY,
            remote_url TEXT NOT NULL,
            branch TEXT NOT NULL,
            commit_sha TEXT NOT NULL,
            ingestion_count INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ingestions (
            ingestion_id TEXT PRIMARY KEY,
            codebase_key TEXT NOT NULL,
            ingestion_counter INTEGER NOT NULL,
            commit_sha TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            superseded_by TEXT,
            UNIQUE (codebase_key, ingestion_counter)
        );

        CREATE TABLE IF NOT EXISTS code_files (
            path TEXT PRIMARY KEY,
            language TEXT,
            project_id TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS classes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            file_path TEXT
        );

        CREATE TABLE IF NOT EXISTS functions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            file_path TEXT,
            class_id TEXT,
            signature TEXT
        );

        CREATE TABLE IF NOT EXISTS code_imports (
            source_path TEXT NOT NULL,
            target_path TEXT NOT NULL,
            symbol TEXT,
            alias TEXT,
            PRIMARY KEY (source_path, target_path, symbol)
        );

        CREATE TABLE IF NOT EXISTS code_relations (
            kind TEXT NOT NULL,
            source_id TEXT NOT NULL,
            target_id TEXT NOT NULL,
            PRIMARY KEY (kind, source_id, target_id)
        );

        CREATE TABLE IF NOT EXISTS doc_files (
            path TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            line_count INTEGER NOT NULL,
            word_count INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            imported_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sections (
            id TEXT PRIMARY KEY,
            doc_path TEXT NOT NULL,
            heading TEXT NOT NULL,
            level INTEGER NOT NULL,
            content TEXT NOT NULL,
            ord INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS concepts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS doc_concepts (
            doc_path TEXT NOT NULL,
            concept_id TEXT NOT NULL,
            PRIMARY KEY (doc_path, concept_id)
        );

        CREATE TABLE IF NOT EXISTS doc_code_refs (
            doc_path TEXT NOT NULL,
            file_path TEXT NOT NULL,
            line INTEGER,
            PRIMARY KEY (doc_path, file_path, line)
        );

        CREATE TABLE IF NOT EXISTS concept_impls (
            concept_id TEXT NOT NULL,
            target_kind TEXT NOT NULL,
            target_id TEXT NOT NULL,
            PRIMARY KEY (concept_id, target_kind, target_id)
        );

        CREATE TABLE IF NOT EXISTS doc_projects (
            doc_path TEXT NOT NULL,
            project_id TEXT NOT NULL,
            PRIMARY KEY (doc_path, project_id)
        );

        CREATE TABLE IF NOT EXISTS external_docs (
            url TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            source TEXT NOT NULL,
            version TEXT NOT NULL,
            trust_score REAL NOT NULL,
            metadata TEXT NOT NULL,
            fetched_at INTEGER NOT NULL,
            ttl_hours INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS external_code_links (
            doc_url TEXT NOT NULL,
            target_kind TEXT NOT NULL,
            target_id TEXT NOT NULL,
            rel TEXT NOT NULL,
            PRIMARY KEY (doc_url, target_kind, target_id)
        );

        CREATE TABLE IF NOT EXISTS memory_sources (
            memory_id TEXT NOT NULL,
            doc_url TEXT NOT NULL,
            PRIMARY KEY (memory_id, doc_url)
        );

        CREATE TABLE IF NOT EXISTS memory_code_links (
            memory_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            target TEXT NOT NULL,
            PRIMARY KEY (memory_id, kind, target)
        );

        CREATE TABLE IF NOT EXISTS api_references (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            signature TEXT NOT NULL,
            doc_url TEXT NOT NULL,
            description TEXT NOT NULL,
            examples TEXT NOT NULL,
            source TEXT NOT NULL,
            version TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS code_index_metadata (
            project_root TEXT PRIMARY KEY,
            last_updated INTEGER,
            file_count INTEGER NOT NULL DEFAULT 0,
            is_placeholder INTEGER NOT NULL DEFAULT 0
        );
        ",
    )
    .map_err(to_query_err)?;
    Ok(())
}

//! Schema and admin operations on the embedded store. Tables come from
//! migrations; constraints and indexes materialize as (unique) SQL
//! indexes so verification can enumerate them by name.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rusqlite::params;

use engram_core::errors::{BackendError, EngramResult};
use engram_core::models::{AgentTypeSeed, ConstraintDef, GraphTotals, IndexDef};
use engram_core::traits::{AdminOps, SchemaOps};

use super::{to_query_err, EmbeddedBackend};

/// Node label → backing table.
fn table_for_label(label: &str) -> Option<&'static str> {
    Some(match label {
        "AgentType" => "agent_types",
        "Project" => "projects",
        "AgentInstance" => "agent_instances",
        "Memory" => "memories",
        "Codebase" => "codebases",
        "Ingestion" => "ingestions",
        "CodeFile" => "code_files",
        "Class" => "classes",
        "Function" => "functions",
        "DocFile" => "doc_files",
        "Section" => "sections",
        "Concept" => "concepts",
        "ExternalDoc" => "external_docs",
        "APIReference" => "api_references",
        "CodeIndexMetadata" => "code_index_metadata",
        _ => return None,
    })
}

fn unknown_label(label: &str) -> engram_core::errors::EngramError {
    BackendError::Query {
        message: format!("no table mapped for label {label}"),
    }
    .into()
}

#[async_trait]
impl SchemaOps for EmbeddedBackend {
    async fn ensure_constraints(&self, defs: &[ConstraintDef]) -> EngramResult<()> {
        let defs = defs.to_vec();
        self.write(move |conn| {
            for def in &defs {
                let table = table_for_label(def.label).ok_or_else(|| unknown_label(def.label))?;
                let sql = format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {table} ({})",
                    def.name, def.property
                );
                if let Err(e) = conn.execute_batch(&sql) {
                    tracing::debug!(constraint = def.name, error = %e, "constraint already exists or error");
                }
            }
            Ok(())
        })
        .await
    }

    async fn ensure_indexes(&self, defs: &[IndexDef]) -> EngramResult<()> {
        let defs = defs.to_vec();
        self.write(move |conn| {
            for def in &defs {
                let table = table_for_label(def.label).ok_or_else(|| unknown_label(def.label))?;
                let sql = format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {table} ({})",
                    def.name, def.property
                );
                if let Err(e) = conn.execute_batch(&sql) {
                    tracing::debug!(index = def.name, error = %e, "index already exists or error");
                }
            }
            Ok(())
        })
        .await
    }

    async fn seed_agent_types(&self, seeds: &[AgentTypeSeed], now_ms: i64) -> EngramResult<()> {
        let seeds = seeds.to_vec();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            for seed in &seeds {
                tx.execute(
                    "INSERT OR IGNORE INTO agent_types (id, name, description, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![seed.id, seed.name, seed.description, now_ms],
                )
                .map_err(to_query_err)?;
            }
            tx.commit().map_err(to_query_err)?;
            Ok(())
        })
        .await
    }

    async fn ensure_code_index_placeholder(&self) -> EngramResult<()> {
        self.write(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO code_index_metadata
                     (project_root, last_updated, file_count, is_placeholder)
                 VALUES ('__placeholder__', NULL, 0, 1)",
                [],
            )
            .map_err(to_query_err)?;
            Ok(())
        })
        .await
    }

    async fn list_constraints(&self) -> EngramResult<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'index' AND sql LIKE 'CREATE UNIQUE INDEX%'
                     ORDER BY name",
                )
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }

    async fn list_indexes(&self) -> EngramResult<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'index'
                       AND sql IS NOT NULL
                       AND sql NOT LIKE 'CREATE UNIQUE INDEX%'
                     ORDER BY name",
                )
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }

    async fn node_counts(&self) -> EngramResult<BTreeMap<String, u64>> {
        self.read(|conn| {
            let labels = [
                "AgentType",
                "Project",
                "AgentInstance",
                "Memory",
                "Codebase",
                "Ingestion",
                "CodeFile",
                "Class",
                "Function",
                "DocFile",
                "Section",
                "Concept",
                "ExternalDoc",
                "APIReference",
                "CodeIndexMetadata",
            ];
            let mut counts = BTreeMap::new();
            for label in labels {
                let table = table_for_label(label).ok_or_else(|| unknown_label(label))?;
                let count: i64 = conn
                    .query_row(&format!("SELECT COUNT(1) FROM {table}"), [], |row| {
                        row.get(0)
                    })
                    .map_err(to_query_err)?;
                if count > 0 {
                    counts.insert(label.to_string(), count as u64);
                }
            }
            Ok(counts)
        })
        .await
    }

    async fn agent_type_count(&self) -> EngramResult<u64> {
        self.read(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(1) FROM agent_types", [], |row| row.get(0))
                .map_err(to_query_err)?;
            Ok(count as u64)
        })
        .await
    }
}

#[async_trait]
impl AdminOps for EmbeddedBackend {
    async fn server_version(&self) -> EngramResult<String> {
        Ok(format!("sqlite {}", rusqlite::version()))
    }

    async fn totals(&self) -> EngramResult<GraphTotals> {
        self.read(|conn| {
            let memories: i64 = conn
                .query_row("SELECT COUNT(1) FROM memories", [], |row| row.get(0))
                .map_err(to_query_err)?;
            let projects: i64 = conn
                .query_row("SELECT COUNT(1) FROM projects", [], |row| row.get(0))
                .map_err(to_query_err)?;
            let agents: i64 = conn
                .query_row("SELECT COUNT(1) FROM agent_instances", [], |row| row.get(0))
                .map_err(to_query_err)?;
            Ok(GraphTotals {
                memories: memories as u64,
                projects: projects as u64,
                agents: agents as u64,
            })
        })
        .await
    }
}

//! Schema and admin operations against the graph server. Creation uses
//! IF NOT EXISTS; duplicate-statement errors are swallowed at debug.

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::Query;

use engram_core::errors::EngramResult;
use engram_core::models::{AgentTypeSeed, ConstraintDef, GraphTotals, IndexDef};
use engram_core::traits::{AdminOps, SchemaOps};

use super::rows::{opt, req};
use super::RemoteBackend;

#[async_trait]
impl SchemaOps for RemoteBackend {
    async fn ensure_constraints(&self, defs: &[ConstraintDef]) -> EngramResult<()> {
        for def in defs {
            let cypher = format!(
                "CREATE CONSTRAINT {} IF NOT EXISTS
                 FOR (n:{}) REQUIRE n.{} IS UNIQUE",
                def.name, def.label, def.property
            );
            if let Err(e) = self.run_write(Query::new(cypher)).await {
                tracing::debug!(constraint = def.name, error = %e, "constraint already exists or error");
            }
        }
        Ok(())
    }

    async fn ensure_indexes(&self, defs: &[IndexDef]) -> EngramResult<()> {
        for def in defs {
            let cypher = format!(
                "CREATE INDEX {} IF NOT EXISTS
                 FOR (n:{}) ON (n.{})",
                def.name, def.label, def.property
            );
            if let Err(e) = self.run_write(Query::new(cypher)).await {
                tracing::debug!(index = def.name, error = %e, "index already exists or error");
            }
        }
        Ok(())
    }

    async fn seed_agent_types(&self, seeds: &[AgentTypeSeed], now_ms: i64) -> EngramResult<()> {
        for seed in seeds {
            let query = Query::new(
                "MERGE (at:AgentType {id: $id})
                 ON CREATE SET
                     at.name = $name,
                     at.description = $description,
                     at.created_at = $now"
                    .to_string(),
            )
            .param("id", seed.id)
            .param("name", seed.name)
            .param("description", seed.description)
            .param("now", now_ms);
            self.run_write(query).await?;
        }
        Ok(())
    }

    async fn ensure_code_index_placeholder(&self) -> EngramResult<()> {
        self.run_write(Query::new(
            "MERGE (m:CodeIndexMetadata {project_root: '__placeholder__'})
             ON CREATE SET
                 m.last_updated = NULL,
                 m.file_count = 0,
                 m.is_placeholder = true"
                .to_string(),
        ))
        .await
        .map(|_| ())
    }

    async fn list_constraints(&self) -> EngramResult<Vec<String>> {
        let rows = self
            .run_read(Query::new("SHOW CONSTRAINTS".to_string()))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| opt::<String>(row, "name"))
            .collect())
    }

    async fn list_indexes(&self) -> EngramResult<Vec<String>> {
        let rows = self.run_read(Query::new("SHOW INDEXES".to_string())).await?;
        Ok(rows
            .iter()
            .filter_map(|row| opt::<String>(row, "name"))
            .collect())
    }

    async fn node_counts(&self) -> EngramResult<BTreeMap<String, u64>> {
        let rows = self
            .run_read(Query::new(
                "MATCH (n)
                 RETURN labels(n)[0] as label, count(n) as count"
                    .to_string(),
            ))
            .await?;
        let mut counts = BTreeMap::new();
        for row in &rows {
            if let Some(label) = opt::<String>(row, "label") {
                counts.insert(label, req::<i64>(row, "count")? as u64);
            }
        }
        Ok(counts)
    }

    async fn agent_type_count(&self) -> EngramResult<u64> {
        let rows = self
            .run_read(Query::new(
                "MATCH (at:AgentType) RETURN count(at) as count".to_string(),
            ))
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "count")? as u64),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl AdminOps for RemoteBackend {
    async fn server_version(&self) -> EngramResult<String> {
        let rows = self
            .run_read(Query::new(
                "CALL dbms.components() YIELD name, versions
                 RETURN name, versions[0] as version"
                    .to_string(),
            ))
            .await?;
        match rows.first() {
            Some(row) => Ok(opt::<String>(row, "version").unwrap_or_else(|| "unknown".into())),
            None => Ok("unknown".to_string()),
        }
    }

    async fn totals(&self) -> EngramResult<GraphTotals> {
        let rows = self
            .run_read(Query::new(
                "OPTIONAL MATCH (m:Memory)
                 WITH count(m) as memories
                 OPTIONAL MATCH (p:Project)
                 WITH memories, count(p) as projects
                 OPTIONAL MATCH (ai:AgentInstance)
                 RETURN memories, projects, count(ai) as agents"
                    .to_string(),
            ))
            .await?;
        match rows.first() {
            Some(row) => Ok(GraphTotals {
                memories: req::<i64>(row, "memories")? as u64,
                projects: req::<i64>(row, "projects")? as u64,
                agents: req::<i64>(row, "agents")? as u64,
            }),
            None => Ok(GraphTotals::default()),
        }
    }
}

//! Schema initialization, verification, and status reporting.

use std::collections::BTreeMap;
use std::sync::Arc;

use engram_core::errors::{EngramResult, SchemaError};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, SchemaOps};

use crate::definitions::{agent_type_seeds, CONSTRAINTS, INDEXES};

/// Detailed schema state for diagnostics.
#[derive(Debug, Clone)]
pub struct SchemaStatus {
    pub constraints: Vec<String>,
    pub indexes: Vec<String>,
    pub node_counts: BTreeMap<String, u64>,
}

/// Manages the memory graph schema. All operations are idempotent.
pub struct SchemaManager {
    backend: Arc<dyn GraphBackend>,
}

impl SchemaManager {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Create constraints, indexes, and seed data. Returns false (after
    /// logging) instead of failing, so startup can proceed degraded.
    pub async fn initialize_schema(&self) -> bool {
        tracing::info!("initializing graph schema");
        match self.initialize_inner().await {
            Ok(()) => {
                tracing::info!("schema initialization complete");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "schema initialization failed");
                false
            }
        }
    }

    async fn initialize_inner(&self) -> EngramResult<()> {
        self.backend.ensure_constraints(CONSTRAINTS).await?;
        self.backend.ensure_indexes(INDEXES).await?;
        self.backend
            .seed_agent_types(&agent_type_seeds(), now_ms())
            .await?;
        self.backend.ensure_code_index_placeholder().await?;
        Ok(())
    }

    /// Verify every expected constraint and index exists and the agent
    /// types are seeded.
    pub async fn verify_schema(&self) -> EngramResult<bool> {
        let existing_constraints = self.backend.list_constraints().await?;
        for def in CONSTRAINTS {
            if !existing_constraints.iter().any(|name| name == def.name) {
                tracing::error!(constraint = def.name, "missing constraint");
                return Err(SchemaError::MissingConstraint {
                    name: def.name.to_string(),
                }
                .into());
            }
        }

        let existing_indexes = self.backend.list_indexes().await?;
        for def in INDEXES {
            if !existing_indexes.iter().any(|name| name == def.name) {
                tracing::error!(index = def.name, "missing index");
                return Err(SchemaError::MissingIndex {
                    name: def.name.to_string(),
                }
                .into());
            }
        }

        let seeded = self.backend.agent_type_count().await?;
        let expected = agent_type_seeds().len() as u64;
        if seeded < expected {
            tracing::error!(found = seeded, expected, "insufficient agent types");
            return Err(SchemaError::SeedIncomplete {
                expected,
                actual: seeded,
            }
            .into());
        }

        tracing::info!("schema verification passed");
        Ok(true)
    }

    /// Current constraints, indexes, and node counts.
    pub async fn schema_status(&self) -> EngramResult<SchemaStatus> {
        Ok(SchemaStatus {
            constraints: self.backend.list_constraints().await?,
            indexes: self.backend.list_indexes().await?,
            node_counts: self.backend.node_counts().await?,
        })
    }
}

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{AgentTypeSeed, ConstraintDef, IndexDef};

/// Schema lifecycle operations. All creation ops are idempotent.
#[async_trait]
pub trait SchemaOps {
    /// Ensure every uniqueness constraint exists. Duplicate-statement
    /// errors are swallowed and logged at debug.
    async fn ensure_constraints(&self, defs: &[ConstraintDef]) -> EngramResult<()>;

    /// Ensure every index exists.
    async fn ensure_indexes(&self, defs: &[IndexDef]) -> EngramResult<()>;

    /// Merge the agent-type seed rows; `created_at` is set only on insert.
    async fn seed_agent_types(&self, seeds: &[AgentTypeSeed], now_ms: i64) -> EngramResult<()>;

    /// Ensure the code-index metadata placeholder exists.
    async fn ensure_code_index_placeholder(&self) -> EngramResult<()>;

    /// Names of existing uniqueness constraints.
    async fn list_constraints(&self) -> EngramResult<Vec<String>>;

    /// Names of existing indexes.
    async fn list_indexes(&self) -> EngramResult<Vec<String>>;

    /// Node counts per label.
    async fn node_counts(&self) -> EngramResult<BTreeMap<String, u64>>;

    /// Number of seeded agent types.
    async fn agent_type_count(&self) -> EngramResult<u64>;
}

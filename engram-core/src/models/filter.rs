use serde::{Deserialize, Serialize};

use crate::memory::MemoryType;

/// Backend-agnostic visibility predicate for memory queries.
///
/// Both backends interpret the same filter: a memory is visible when it
/// is scoped to `project_id`. With `include_global` it is also visible
/// when universally scoped, scoped to the global project, or promoted
/// to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationFilter {
    pub project_id: String,
    pub include_global: bool,
    /// Restrict to memories owned by this agent type.
    pub agent_type: Option<String>,
    /// Restrict to memories created by this instance.
    pub agent_instance_id: Option<String>,
    /// Only memories created at or after this time (epoch ms).
    pub created_after: Option<i64>,
    /// Only memories with importance at or above this value.
    pub min_importance: Option<u8>,
    /// Only memories of these types.
    pub memory_types: Option<Vec<MemoryType>>,
}

impl IsolationFilter {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            include_global: true,
            agent_type: None,
            agent_instance_id: None,
            created_after: None,
            min_importance: None,
            memory_types: None,
        }
    }
}

/// A uniqueness constraint on one node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintDef {
    /// Stable constraint name, e.g. `memory_id`.
    pub name: &'static str,
    pub label: &'static str,
    pub property: &'static str,
}

/// A non-unique index on one node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Stable index name, e.g. `memory_created_at`.
    pub name: &'static str,
    pub label: &'static str,
    pub property: &'static str,
}

/// Seed row for one agent type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentTypeSeed {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

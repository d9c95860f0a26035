use serde::{Deserialize, Serialize};

/// Node totals reported by the backend for health snapshots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GraphTotals {
    pub memories: u64,
    pub projects: u64,
    pub agents: u64,
}

/// Externally managed container state, as reported by the container
/// lifecycle collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Unhealthy,
    Missing,
    /// No container runtime is attached (embedded backend).
    Detached,
}

impl ContainerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerStatus::Running => "running",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Unhealthy => "unhealthy",
            ContainerStatus::Missing => "missing",
            ContainerStatus::Detached => "detached",
        }
    }
}

//! System health snapshots: backend reachability, response time, node
//! totals, container state, and accumulated issues.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use engram_core::models::{CircuitState, ContainerStatus};
use engram_core::time::now_ms;
use engram_core::traits::{AdminOps, ContainerControl, GraphBackend};

/// One health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub is_healthy: bool,
    pub backend_available: bool,
    pub backend_version: Option<String>,
    pub container_status: ContainerStatus,
    pub response_time_ms: f64,
    pub total_memories: u64,
    pub total_projects: u64,
    pub total_agents: u64,
    pub issues: Vec<String>,
    pub timestamp: i64,
}

/// Produces health snapshots. Degradation is reported, never thrown.
pub struct HealthMonitor {
    backend: Arc<dyn GraphBackend>,
    container: Option<Arc<dyn ContainerControl>>,
}

impl HealthMonitor {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self {
            backend,
            container: None,
        }
    }

    /// Attach the container lifecycle collaborator, when one exists.
    pub fn with_container(mut self, container: Arc<dyn ContainerControl>) -> Self {
        self.container = Some(container);
        self
    }

    pub async fn check_health(&self) -> SystemHealth {
        let mut issues = Vec::new();

        let started = Instant::now();
        let backend_available = self.backend.verify_connectivity().await;
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        if !backend_available {
            issues.push("graph backend unreachable".to_string());
        }

        let breaker = self.backend.circuit_state();
        if breaker.state != CircuitState::Closed {
            issues.push(format!("circuit breaker {}", breaker.state.as_str()));
        }

        let backend_version = if backend_available {
            match self.backend.server_version().await {
                Ok(version) => Some(version),
                Err(e) => {
                    issues.push(format!("version query failed: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let totals = if backend_available {
            match self.backend.totals().await {
                Ok(totals) => totals,
                Err(e) => {
                    issues.push(format!("totals query failed: {e}"));
                    Default::default()
                }
            }
        } else {
            Default::default()
        };

        let container_status = match &self.container {
            Some(container) => {
                let status = container.status().await;
                if matches!(status, ContainerStatus::Unhealthy | ContainerStatus::Missing) {
                    issues.push(format!("container {}", status.as_str()));
                }
                status
            }
            None => ContainerStatus::Detached,
        };

        SystemHealth {
            is_healthy: issues.is_empty(),
            backend_available,
            backend_version,
            container_status,
            response_time_ms,
            total_memories: totals.memories,
            total_projects: totals.projects,
            total_agents: totals.agents,
            issues,
            timestamp: now_ms(),
        }
    }
}

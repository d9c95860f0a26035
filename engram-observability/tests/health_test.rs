use std::sync::Arc;

use async_trait::async_trait;

use engram_backend::EmbeddedBackend;
use engram_core::models::ContainerStatus;
use engram_core::traits::{ContainerControl, GraphBackend};
use engram_observability::HealthMonitor;

struct StubContainer {
    status: ContainerStatus,
}

#[async_trait]
impl ContainerControl for StubContainer {
    async fn ensure_running(&self) -> bool {
        self.status == ContainerStatus::Running
    }

    async fn stop(&self) -> bool {
        true
    }

    async fn status(&self) -> ContainerStatus {
        self.status
    }
}

fn backend() -> Arc<dyn GraphBackend> {
    Arc::new(EmbeddedBackend::open_in_memory().unwrap())
}

#[tokio::test]
async fn healthy_store_reports_no_issues() {
    let monitor = HealthMonitor::new(backend());
    let health = monitor.check_health().await;

    assert!(health.is_healthy);
    assert!(health.backend_available);
    assert!(health.backend_version.unwrap().contains("sqlite"));
    assert_eq!(health.container_status, ContainerStatus::Detached);
    assert!(health.issues.is_empty());
    assert!(health.response_time_ms >= 0.0);
}

#[tokio::test]
async fn closed_backend_surfaces_as_issue_not_error() {
    let backend = backend();
    backend.close().await;

    let monitor = HealthMonitor::new(backend);
    let health = monitor.check_health().await;

    assert!(!health.is_healthy);
    assert!(!health.backend_available);
    assert!(health
        .issues
        .iter()
        .any(|issue| issue.contains("unreachable")));
}

#[tokio::test]
async fn unhealthy_container_is_reported() {
    let monitor = HealthMonitor::new(backend()).with_container(Arc::new(StubContainer {
        status: ContainerStatus::Unhealthy,
    }));
    let health = monitor.check_health().await;

    assert_eq!(health.container_status, ContainerStatus::Unhealthy);
    assert!(!health.is_healthy);
    assert!(health.issues.iter().any(|issue| issue.contains("container")));
}

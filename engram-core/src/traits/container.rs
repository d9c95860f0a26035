use async_trait::async_trait;

use crate::models::ContainerStatus;

/// Interface to the externally managed container lifecycle. The memory
/// core only consumes status; process control lives elsewhere.
#[async_trait]
pub trait ContainerControl: Send + Sync {
    /// Start the container if needed; true when it ends up running.
    async fn ensure_running(&self) -> bool;

    /// Stop the container; true on success.
    async fn stop(&self) -> bool;

    async fn status(&self) -> ContainerStatus;
}

use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::GraphTotals;

/// Administrative queries used by health reporting.
#[async_trait]
pub trait AdminOps {
    /// Backend server/library version string.
    async fn server_version(&self) -> EngramResult<String>;

    /// Node totals for the health snapshot.
    async fn totals(&self) -> EngramResult<GraphTotals>;
}

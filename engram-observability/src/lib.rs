//! # engram-observability
//!
//! Operation metrics in a bounded ring buffer, system health snapshots,
//! and tracing setup.

mod health;
mod metrics;
mod telemetry;

pub use health::{HealthMonitor, SystemHealth};
pub use metrics::{
    MetricsCollector, OperationMetric, OperationStatistics, OperationStatus, OperationType,
};
pub use telemetry::init_tracing;

//! Operation metrics: a mutex-guarded ring buffer with aggregate
//! statistics including p95 latency.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use engram_core::constants::METRICS_MAX_HISTORY;
use engram_core::time::now_ms;

/// Types of monitored operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Connect,
    Query,
    Write,
    Retrieval,
    Consolidation,
    Ingestion,
    HealthCheck,
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Failure,
    Timeout,
    Retry,
}

/// One recorded operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetric {
    pub operation_type: OperationType,
    pub status: OperationStatus,
    pub duration_ms: f64,
    pub timestamp: i64,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

/// Aggregate statistics over the retained window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationStatistics {
    pub count: usize,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub p95_duration_ms: f64,
}

/// Bounded in-memory metrics collector. Safe to share across threads.
pub struct MetricsCollector {
    max_history: usize,
    metrics: Mutex<VecDeque<OperationMetric>>,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            metrics: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(
        &self,
        operation_type: OperationType,
        status: OperationStatus,
        duration_ms: f64,
        error: Option<String>,
        metadata: serde_json::Value,
    ) {
        let metric = OperationMetric {
            operation_type,
            status,
            duration_ms,
            timestamp: now_ms(),
            error,
            metadata,
        };
        let mut metrics = self.lock();
        if metrics.len() == self.max_history {
            metrics.pop_front();
        }
        metrics.push_back(metric);
    }

    /// Statistics over the retained window, optionally narrowed to one
    /// operation type.
    pub fn statistics(&self, operation_type: Option<OperationType>) -> OperationStatistics {
        let metrics = self.lock();
        let mut durations: Vec<f64> = Vec::new();
        let mut successes = 0usize;
        let mut count = 0usize;

        for metric in metrics.iter() {
            if operation_type.is_some_and(|t| t != metric.operation_type) {
                continue;
            }
            count += 1;
            durations.push(metric.duration_ms);
            if metric.status == OperationStatus::Success {
                successes += 1;
            }
        }
        if count == 0 {
            return OperationStatistics::default();
        }

        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let total: f64 = durations.iter().sum();
        let p95_index = ((count as f64) * 0.95).ceil() as usize;
        let p95 = durations[p95_index.clamp(1, count) - 1];

        OperationStatistics {
            count,
            success_rate: successes as f64 / count as f64,
            avg_duration_ms: total / count as f64,
            min_duration_ms: durations[0],
            max_duration_ms: durations[count - 1],
            p95_duration_ms: p95,
        }
    }

    /// Most recent failures, newest first.
    pub fn recent_errors(&self, limit: usize) -> Vec<OperationMetric> {
        let metrics = self.lock();
        metrics
            .iter()
            .rev()
            .filter(|m| m.status != OperationStatus::Success)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<OperationMetric>> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(METRICS_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_n(collector: &MetricsCollector, n: usize, status: OperationStatus) {
        for i in 0..n {
            collector.record(
                OperationType::Query,
                status,
                i as f64,
                None,
                serde_json::Value::Null,
            );
        }
    }

    #[test]
    fn ring_buffer_caps_history() {
        let collector = MetricsCollector::new(10);
        record_n(&collector, 25, OperationStatus::Success);
        assert_eq!(collector.len(), 10);
        // The retained window is the most recent 10 durations: 15..25.
        let stats = collector.statistics(None);
        assert_eq!(stats.min_duration_ms, 15.0);
        assert_eq!(stats.max_duration_ms, 24.0);
    }

    #[test]
    fn statistics_filter_by_type() {
        let collector = MetricsCollector::default();
        collector.record(
            OperationType::Query,
            OperationStatus::Success,
            10.0,
            None,
            serde_json::Value::Null,
        );
        collector.record(
            OperationType::Write,
            OperationStatus::Failure,
            50.0,
            Some("boom".to_string()),
            serde_json::Value::Null,
        );

        let queries = collector.statistics(Some(OperationType::Query));
        assert_eq!(queries.count, 1);
        assert_eq!(queries.success_rate, 1.0);

        let all = collector.statistics(None);
        assert_eq!(all.count, 2);
        assert_eq!(all.success_rate, 0.5);
    }

    #[test]
    fn p95_is_the_95th_percentile() {
        let collector = MetricsCollector::new(200);
        record_n(&collector, 100, OperationStatus::Success);
        let stats = collector.statistics(None);
        assert_eq!(stats.p95_duration_ms, 94.0);
    }

    #[test]
    fn recent_errors_newest_first() {
        let collector = MetricsCollector::default();
        for i in 0..3 {
            collector.record(
                OperationType::Write,
                OperationStatus::Failure,
                1.0,
                Some(format!("error {i}")),
                serde_json::Value::Null,
            );
        }
        let errors = collector.recent_errors(2);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error.as_deref(), Some("error 2"));
    }

    #[test]
    fn clear_empties_the_buffer() {
        let collector = MetricsCollector::default();
        record_n(&collector, 5, OperationStatus::Success);
        collector.clear();
        assert!(collector.is_empty());
    }
}

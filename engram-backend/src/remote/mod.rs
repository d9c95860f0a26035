//! Remote backend: parameterized Cypher over bolt.
//!
//! Every operation funnels through [`RemoteBackend::run_read`] /
//! [`RemoteBackend::run_write`]. Writes run inside an explicit
//! transaction whose result set is fully consumed before commit; both
//! paths apply the shared retry and circuit-breaker policy.

mod consolidation_ops;
mod filters;
mod ingestion_ops;
mod knowledge_ops;
mod memory_ops;
mod retrieval_ops;
mod rows;
mod schema_ops;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{Graph, Query, Row};
use tokio::sync::RwLock;

use engram_core::config::{BackendKind, GraphConfig};
use engram_core::errors::{BackendError, ConfigError, EngramError, EngramResult};
use engram_core::models::BreakerSnapshot;
use engram_core::traits::GraphBackend;

use crate::breaker::CircuitBreaker;
use crate::retry::RetryPolicy;

/// Map a driver error into the backend taxonomy. Connection and IO
/// failures are transient; everything else is a query failure.
pub(crate) fn classify_driver_err(e: neo4rs::Error) -> EngramError {
    let message = e.to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("connection") || lowered.contains("io error") || lowered.contains("unavailable")
    {
        BackendError::ServiceUnavailable {
            attempts: 1,
            message,
        }
        .into()
    } else {
        BackendError::Query { message }.into()
    }
}

pub struct RemoteBackend {
    config: GraphConfig,
    graph: RwLock<Option<Graph>>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl RemoteBackend {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            graph: RwLock::new(None),
            breaker: Arc::new(CircuitBreaker::default()),
            retry: RetryPolicy::default(),
        }
    }

    /// Share a process-wide breaker instead of the default private one.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Establish the bolt driver. Idempotent.
    pub async fn connect(&self) -> EngramResult<()> {
        let mut guard = self.graph.write().await;
        if guard.is_some() {
            return Ok(());
        }
        let password = self.config.password.as_deref().ok_or(ConfigError::MissingVar {
            name: "GRAPH_PASSWORD".to_string(),
        })?;
        let graph = Graph::new(&self.config.uri, &self.config.user, password)
            .await
            .map_err(classify_driver_err)?;
        tracing::debug!(uri = %self.config.uri, "connected to graph server");
        *guard = Some(graph);
        Ok(())
    }

    pub(crate) async fn run_read(&self, query: Query) -> EngramResult<Vec<Row>> {
        self.run(query, false, self.config.write_timeout).await
    }

    pub(crate) async fn run_write(&self, query: Query) -> EngramResult<Vec<Row>> {
        self.run(query, true, self.config.write_timeout).await
    }

    async fn run(
        &self,
        query: Query,
        is_write: bool,
        timeout: Duration,
    ) -> EngramResult<Vec<Row>> {
        self.breaker.check().map_err(EngramError::from)?;

        let mut attempt: u32 = 0;
        loop {
            let result = self.attempt(query.clone(), is_write, timeout).await;
            match result {
                Ok(rows) => {
                    self.breaker.record_success();
                    return Ok(rows);
                }
                Err(e) if e.is_transient() && attempt + 1 < self.retry.max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = self.retry.max_retries,
                        error = %e,
                        "query failed, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    self.breaker.record_failure();
                    return Err(BackendError::ServiceUnavailable {
                        attempts: self.retry.max_retries,
                        message: e.to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    self.breaker.record_failure();
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(
        &self,
        query: Query,
        is_write: bool,
        timeout: Duration,
    ) -> EngramResult<Vec<Row>> {
        let guard = self.graph.read().await;
        let graph = guard.as_ref().ok_or(BackendError::NotConnected)?;

        let work = async {
            if is_write {
                // Consume the full result set inside the transaction; no
                // cursor may outlive the commit.
                let mut txn = graph.start_txn().await.map_err(classify_driver_err)?;
                let mut stream = txn.execute(query).await.map_err(classify_driver_err)?;
                let mut rows = Vec::new();
                while let Some(row) = stream
                    .next(txn.handle())
                    .await
                    .map_err(classify_driver_err)?
                {
                    rows.push(row);
                }
                txn.commit().await.map_err(classify_driver_err)?;
                Ok(rows)
            } else {
                let mut stream = graph.execute(query).await.map_err(classify_driver_err)?;
                let mut rows = Vec::new();
                while let Some(row) = stream.next().await.map_err(classify_driver_err)? {
                    rows.push(row);
                }
                Ok(rows)
            }
        };

        match tokio::time::timeout(timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
            .into()),
        }
    }
}

#[async_trait]
impl GraphBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn verify_connectivity(&self) -> bool {
        let probe = self.run(
            Query::new("RETURN 1 as num".to_string()),
            false,
            self.config.probe_timeout,
        );
        match probe.await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get::<i64>("num").ok())
                .is_some_and(|n| n == 1),
            Err(e) => {
                tracing::debug!(error = %e, "connectivity check failed");
                false
            }
        }
    }

    fn circuit_state(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    async fn close(&self) {
        let mut guard = self.graph.write().await;
        if guard.take().is_some() {
            tracing::debug!("closed graph connection");
        }
    }
}

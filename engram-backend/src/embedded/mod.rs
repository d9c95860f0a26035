//! Embedded backend: the property graph rendered onto SQLite.
//!
//! Every operation funnels through [`EmbeddedBackend::read`] /
//! [`EmbeddedBackend::write`], which run the closure on a pooled
//! connection inside `spawn_blocking` and apply the shared retry and
//! circuit-breaker policy.

pub mod migrations;
pub mod pool;
pub mod pragmas;

mod consolidation_ops;
mod filters;
mod ingestion_ops;
mod knowledge_ops;
mod memory_ops;
mod retrieval_ops;
mod rows;
mod schema_ops;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;

use engram_core::config::BackendKind;
use engram_core::errors::{BackendError, EngramError, EngramResult};
use engram_core::models::BreakerSnapshot;
use engram_core::traits::GraphBackend;

use crate::breaker::CircuitBreaker;
use crate::retry::RetryPolicy;

use pool::ConnectionPool;

/// Map a SQLite error into the backend taxonomy. Busy/locked databases
/// are transient; everything else is a query failure.
pub(crate) fn to_query_err(e: rusqlite::Error) -> EngramError {
    let transient = matches!(
        &e,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::DatabaseBusy
                || code.code == rusqlite::ErrorCode::DatabaseLocked
    );
    if transient {
        BackendError::ServiceUnavailable {
            attempts: 1,
            message: e.to_string(),
        }
        .into()
    } else {
        BackendError::Query {
            message: e.to_string(),
        }
        .into()
    }
}

pub struct EmbeddedBackend {
    pool: Arc<ConnectionPool>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    closed: AtomicBool,
}

impl EmbeddedBackend {
    /// Open a file-backed store, creating the parent directory and running
    /// migrations.
    pub fn open(path: &Path) -> EngramResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = ConnectionPool::open(path, ConnectionPool::default_read_pool_size())?;
        Self::from_pool(pool)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> EngramResult<Self> {
        Self::from_pool(ConnectionPool::open_in_memory()?)
    }

    fn from_pool(pool: ConnectionPool) -> EngramResult<Self> {
        pool.with_write(migrations::run_migrations)?;
        Ok(Self {
            pool: Arc::new(pool),
            breaker: Arc::new(CircuitBreaker::default()),
            retry: RetryPolicy::default(),
            closed: AtomicBool::new(false),
        })
    }

    /// Share a process-wide breaker instead of the default private one.
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) async fn read<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: Fn(&Connection) -> EngramResult<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.run(false, f).await
    }

    pub(crate) async fn write<T, F>(&self, f: F) -> EngramResult<T>
    where
        F: Fn(&Connection) -> EngramResult<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.run(true, f).await
    }

    async fn run<T, F>(&self, is_write: bool, f: F) -> EngramResult<T>
    where
        F: Fn(&Connection) -> EngramResult<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::NotConnected.into());
        }
        self.breaker.check().map_err(EngramError::from)?;

        let f = Arc::new(f);
        let mut attempt: u32 = 0;
        loop {
            let pool = Arc::clone(&self.pool);
            let f = Arc::clone(&f);
            let joined = tokio::task::spawn_blocking(move || {
                if is_write {
                    pool.with_write(|conn| (*f)(conn))
                } else {
                    pool.with_read(|conn| (*f)(conn))
                }
            })
            .await;

            let result = match joined {
                Ok(r) => r,
                Err(e) => Err(BackendError::Query {
                    message: format!("blocking task failed: {e}"),
                }
                .into()),
            };

            match result {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt + 1 < self.retry.max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = self.retry.max_retries,
                        error = %e,
                        "embedded operation failed, retrying"
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
}

#[async_trait]
impl GraphBackend for EmbeddedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    async fn verify_connectivity(&self) -> bool {
        self.read(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(to_query_err)
        })
        .await
        .map(|n| n == 1)
        .unwrap_or(false)
    }

    fn circuit_state(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

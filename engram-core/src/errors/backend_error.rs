/// Errors produced by the graph backend connector.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not connected; call connect() first")]
    NotConnected,

    #[error("circuit breaker is open; retry in {retry_in_secs}s")]
    CircuitOpen { retry_in_secs: u64 },

    #[error("service unavailable after {attempts} attempts: {message}")]
    ServiceUnavailable { attempts: u32, message: String },

    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("query failed: {message}")]
    Query { message: String },
}

impl BackendError {
    /// Transient errors are eligible for retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::ServiceUnavailable { .. } | BackendError::Timeout { .. }
        )
    }
}

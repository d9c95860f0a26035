//! Error taxonomy. Each subsystem has its own error enum; `EngramError`
//! unifies them for callers that cross subsystem boundaries.

mod backend_error;
mod config_error;
mod ingestion_error;
mod retrieval_error;
mod schema_error;
mod store_error;

pub use backend_error::BackendError;
pub use config_error::ConfigError;
pub use ingestion_error::IngestionError;
pub use retrieval_error::RetrievalError;
pub use schema_error::SchemaError;
pub use store_error::StoreError;

/// Unified error type for the Engram system.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("serialization failed: {message}")]
    Serialization { message: String },

    #[error("io error: {message}")]
    Io { message: String },
}

impl EngramError {
    /// Whether retrying the operation may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngramError::Backend(BackendError::ServiceUnavailable { .. })
                | EngramError::Backend(BackendError::Timeout { .. })
        )
    }
}

impl From<serde_json::Error> for EngramError {
    fn from(e: serde_json::Error) -> Self {
        EngramError::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for EngramError {
    fn from(e: std::io::Error) -> Self {
        EngramError::Io {
            message: e.to_string(),
        }
    }
}

/// Result alias used throughout the workspace.
pub type EngramResult<T> = Result<T, EngramError>;

/// Ingestion-tracking errors, wrapping the underlying cause.
/// The high-level tracking API converts these into an ERROR result
/// instead of propagating.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("invalid codebase identity: {reason}")]
    InvalidIdentity { reason: String },

    #[error("ingestion tracking failed: {message}")]
    Tracking { message: String },
}

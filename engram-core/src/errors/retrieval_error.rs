/// Retrieval subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid retrieval context: {reason}")]
    InvalidContext { reason: String },

    #[error("strategy weights must sum to 1.0, got {total}")]
    WeightSum { total: f64 },

    #[error("missing retrieval input: {what}")]
    MissingInput { what: String },
}

/// Memory-store errors, surfaced to callers without retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown agent type: {id}")]
    UnknownAgentType { id: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("memory not found: {id}")]
    NotFound { id: String },
}

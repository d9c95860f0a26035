/// Schema invariant violations detected at verification time.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing constraint: {name}")]
    MissingConstraint { name: String },

    #[error("missing index: {name}")]
    MissingIndex { name: String },

    #[error("agent type seed incomplete: expected {expected}, found {actual}")]
    SeedIncomplete { expected: u64, actual: u64 },

    #[error("schema initialization failed: {message}")]
    InitFailed { message: String },
}

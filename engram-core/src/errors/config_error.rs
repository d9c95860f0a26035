/// Configuration errors. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingVar { name: String },

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },

    #[error("no graph backend available:\n{details}")]
    NoBackendAvailable { details: String },
}

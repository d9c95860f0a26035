//! # engram-backend
//!
//! The two graph backends (embedded SQLite rendering, remote bolt server)
//! behind one trait surface, plus the shared resilience layer (retry with
//! exponential backoff, process-wide circuit breaker) and the runtime
//! backend selector.

pub mod breaker;
pub mod embedded;
pub mod remote;
pub mod retry;
pub mod selector;

pub use breaker::{BreakerConfig, CircuitBreaker};
pub use embedded::EmbeddedBackend;
pub use remote::RemoteBackend;
pub use retry::RetryPolicy;
pub use selector::{open_backend, select_backend, BackendChoice};

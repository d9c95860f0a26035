//! # engram-agent
//!
//! The agent-facing facade. Scoped to one agent type and project, with an
//! ephemeral instance id. Degrades gracefully: unexpected failures are
//! logged and surface as empty results or false, never as panics.

mod facade;

pub use facade::{AgentMemory, Remember};

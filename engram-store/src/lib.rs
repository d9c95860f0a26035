//! # engram-store
//!
//! The memory store: validated CRUD over memory nodes, project/universal
//! scoping, and usage/validation recording with derived statistics.

mod store;

pub use store::{CreateMemory, MemoryStore};

//! # engram-schema
//!
//! Idempotent schema lifecycle for the memory graph: uniqueness
//! constraints, performance indexes, agent-type seed data, and
//! verification.

mod definitions;
mod manager;

pub use definitions::{agent_type_seeds, CONSTRAINTS, INDEXES};
pub use manager::{SchemaManager, SchemaStatus};

//! Memory domain types: the record itself, its closed enums, and the
//! clamped score newtype.

mod agent_role;
mod record;
mod score;
mod types;

pub use agent_role::AgentRole;
pub use record::{
    MemoryDraft, MemoryPatch, MemoryRecord, MemoryScope, MemoryStats, UsageRecord,
    ValidationRecord,
};
pub use score::Score;
pub use types::{MemoryType, Outcome, ScopeKind};

//! Retrieval context: who is asking, and which memories they may see.

use serde::{Deserialize, Serialize};

use engram_core::errors::{EngramResult, RetrievalError};
use engram_core::memory::MemoryType;
use engram_core::models::IsolationFilter;
use engram_core::time::HOUR_MS;

/// Memory isolation levels, from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Isolated by project.
    Project,
    /// Isolated by agent type within a project.
    AgentType,
    /// Isolated by agent instance (ephemeral session state).
    Instance,
}

/// Context for a retrieval call. Defines the identity, isolation
/// boundary, and time/quality filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalContext {
    pub project_id: String,
    pub agent_type: String,
    pub agent_instance_id: Option<String>,
    pub isolation_level: IsolationLevel,
    /// Include globally visible memories.
    pub include_global: bool,
    /// Only memories created within this many hours.
    pub time_window_hours: Option<u64>,
    /// Only memories created at or after this time (epoch ms).
    pub since: Option<i64>,
    pub min_importance: Option<u8>,
    pub memory_types: Option<Vec<MemoryType>>,
}

impl RetrievalContext {
    pub fn new(project_id: impl Into<String>, agent_type: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            agent_type: agent_type.into(),
            agent_instance_id: None,
            isolation_level: IsolationLevel::AgentType,
            include_global: true,
            time_window_hours: None,
            since: None,
            min_importance: None,
            memory_types: None,
        }
    }

    pub fn validate(&self) -> EngramResult<()> {
        if self.project_id.is_empty() || self.agent_type.is_empty() {
            return Err(RetrievalError::InvalidContext {
                reason: "project_id and agent_type are required".to_string(),
            }
            .into());
        }
        if self.isolation_level == IsolationLevel::Instance && self.agent_instance_id.is_none() {
            return Err(RetrievalError::InvalidContext {
                reason: "instance isolation requires agent_instance_id".to_string(),
            }
            .into());
        }
        if let Some(min_importance) = self.min_importance {
            if !(1..=10).contains(&min_importance) {
                return Err(RetrievalError::InvalidContext {
                    reason: format!("min_importance must be in 1..=10, got {min_importance}"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Render into the backend-agnostic filter, resolving the time window
    /// against `now_ms`.
    pub fn to_filter(&self, now_ms: i64) -> IsolationFilter {
        let window_cutoff = self
            .time_window_hours
            .map(|hours| now_ms - (hours as i64) * HOUR_MS);
        let created_after = match (window_cutoff, self.since) {
            (Some(window), Some(since)) => Some(window.max(since)),
            (Some(window), None) => Some(window),
            (None, Some(since)) => Some(since),
            (None, None) => None,
        };

        IsolationFilter {
            project_id: self.project_id.clone(),
            include_global: self.include_global,
            agent_type: match self.isolation_level {
                IsolationLevel::Project => None,
                IsolationLevel::AgentType | IsolationLevel::Instance => {
                    Some(self.agent_type.clone())
                }
            },
            agent_instance_id: match self.isolation_level {
                IsolationLevel::Instance => self.agent_instance_id.clone(),
                _ => None,
            },
            created_after,
            min_importance: self.min_importance,
            memory_types: self.memory_types.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_identity_is_invalid() {
        let ctx = RetrievalContext::new("", "architect");
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn instance_isolation_requires_instance_id() {
        let mut ctx = RetrievalContext::new("p1", "architect");
        ctx.isolation_level = IsolationLevel::Instance;
        assert!(ctx.validate().is_err());
        ctx.agent_instance_id = Some("architect_ab12cd34".to_string());
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn min_importance_bounds() {
        let mut ctx = RetrievalContext::new("p1", "architect");
        ctx.min_importance = Some(0);
        assert!(ctx.validate().is_err());
        ctx.min_importance = Some(11);
        assert!(ctx.validate().is_err());
        ctx.min_importance = Some(10);
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn zero_hour_window_cuts_off_at_now() {
        let mut ctx = RetrievalContext::new("p1", "architect");
        ctx.time_window_hours = Some(0);
        let filter = ctx.to_filter(1_000_000);
        assert_eq!(filter.created_after, Some(1_000_000));
    }

    #[test]
    fn window_and_since_take_the_tighter_cutoff() {
        let mut ctx = RetrievalContext::new("p1", "architect");
        ctx.time_window_hours = Some(1);
        ctx.since = Some(999_999_999);
        let filter = ctx.to_filter(1_000_000_000);
        assert_eq!(filter.created_after, Some(999_999_999.max(1_000_000_000 - HOUR_MS)));
    }

    #[test]
    fn project_isolation_drops_agent_type_filter() {
        let mut ctx = RetrievalContext::new("p1", "architect");
        ctx.isolation_level = IsolationLevel::Project;
        let filter = ctx.to_filter(0);
        assert!(filter.agent_type.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::{EngramResult, StoreError};

/// The closed set of memory types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Procedural,
    Declarative,
    Episodic,
    ShortTerm,
    Prospective,
    AntiPattern,
}

impl MemoryType {
    pub const ALL: [MemoryType; 6] = [
        MemoryType::Procedural,
        MemoryType::Declarative,
        MemoryType::Episodic,
        MemoryType::ShortTerm,
        MemoryType::Prospective,
        MemoryType::AntiPattern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MemoryType::Procedural => "procedural",
            MemoryType::Declarative => "declarative",
            MemoryType::Episodic => "episodic",
            MemoryType::ShortTerm => "short_term",
            MemoryType::Prospective => "prospective",
            MemoryType::AntiPattern => "anti_pattern",
        }
    }

    pub fn parse(s: &str) -> EngramResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                StoreError::InvalidArgument {
                    message: format!("unknown memory type: {s}"),
                }
                .into()
            })
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying or validating a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Successful,
    Failed,
    Partial,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Successful => "successful",
            Outcome::Failed => "failed",
            Outcome::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> EngramResult<Self> {
        match s {
            "successful" => Ok(Outcome::Successful),
            "failed" => Ok(Outcome::Failed),
            "partial" => Ok(Outcome::Partial),
            _ => Err(StoreError::InvalidArgument {
                message: format!("unknown outcome: {s}"),
            }
            .into()),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a memory's single scope edge points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Scoped to a specific project.
    Project,
    /// Universal: scoped to the owning agent type.
    AgentType,
}

impl ScopeKind {
    /// The `scope_type` property value stored on the edge.
    pub fn scope_type(self) -> &'static str {
        match self {
            ScopeKind::Project => "project_specific",
            ScopeKind::AgentType => "universal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_roundtrip() {
        for t in MemoryType::ALL {
            assert_eq!(MemoryType::parse(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn unknown_memory_type_is_invalid_argument() {
        assert!(MemoryType::parse("meta").is_err());
    }

    #[test]
    fn outcome_parse() {
        assert_eq!(Outcome::parse("partial").unwrap(), Outcome::Partial);
        assert!(Outcome::parse("unknown").is_err());
    }
}

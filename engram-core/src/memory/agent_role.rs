use serde::{Deserialize, Serialize};

/// The closed set of fourteen agent roles. Memories are always owned by
/// exactly one role. `parse` is lenient: unknown names warn instead of
/// failing so newer role sets remain usable against older stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Architect,
    Builder,
    Reviewer,
    Tester,
    Optimizer,
    Security,
    Database,
    ApiDesigner,
    Integration,
    Analyzer,
    Cleanup,
    PreCommitDiagnostic,
    CiDiagnostic,
    FixAgent,
}

impl AgentRole {
    pub const ALL: [AgentRole; 14] = [
        AgentRole::Architect,
        AgentRole::Builder,
        AgentRole::Reviewer,
        AgentRole::Tester,
        AgentRole::Optimizer,
        AgentRole::Security,
        AgentRole::Database,
        AgentRole::ApiDesigner,
        AgentRole::Integration,
        AgentRole::Analyzer,
        AgentRole::Cleanup,
        AgentRole::PreCommitDiagnostic,
        AgentRole::CiDiagnostic,
        AgentRole::FixAgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Architect => "architect",
            AgentRole::Builder => "builder",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Tester => "tester",
            AgentRole::Optimizer => "optimizer",
            AgentRole::Security => "security",
            AgentRole::Database => "database",
            AgentRole::ApiDesigner => "api-designer",
            AgentRole::Integration => "integration",
            AgentRole::Analyzer => "analyzer",
            AgentRole::Cleanup => "cleanup",
            AgentRole::PreCommitDiagnostic => "pre-commit-diagnostic",
            AgentRole::CiDiagnostic => "ci-diagnostic",
            AgentRole::FixAgent => "fix-agent",
        }
    }

    /// Human-readable display name, used for seed data.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Architect => "Architect Agent",
            AgentRole::Builder => "Builder Agent",
            AgentRole::Reviewer => "Reviewer Agent",
            AgentRole::Tester => "Tester Agent",
            AgentRole::Optimizer => "Optimizer Agent",
            AgentRole::Security => "Security Agent",
            AgentRole::Database => "Database Agent",
            AgentRole::ApiDesigner => "API Designer Agent",
            AgentRole::Integration => "Integration Agent",
            AgentRole::Analyzer => "Analyzer Agent",
            AgentRole::Cleanup => "Cleanup Agent",
            AgentRole::PreCommitDiagnostic => "Pre-commit Diagnostic Agent",
            AgentRole::CiDiagnostic => "CI Diagnostic Agent",
            AgentRole::FixAgent => "Fix Agent",
        }
    }

    /// One-line responsibility, used for seed data.
    pub fn description(self) -> &'static str {
        match self {
            AgentRole::Architect => "System design and architecture",
            AgentRole::Builder => "Code implementation",
            AgentRole::Reviewer => "Code review and quality assurance",
            AgentRole::Tester => "Test generation and validation",
            AgentRole::Optimizer => "Performance optimization",
            AgentRole::Security => "Security analysis and vulnerability assessment",
            AgentRole::Database => "Database schema and query optimization",
            AgentRole::ApiDesigner => "API contract and endpoint design",
            AgentRole::Integration => "External service integration",
            AgentRole::Analyzer => "Code analysis and understanding",
            AgentRole::Cleanup => "Code cleanup and simplification",
            AgentRole::PreCommitDiagnostic => "Pre-commit hook diagnostics",
            AgentRole::CiDiagnostic => "CI pipeline diagnostics",
            AgentRole::FixAgent => "Automated issue resolution",
        }
    }

    /// Strict lookup of a known role.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == id)
    }

    /// Whether the given id names a known role.
    pub fn is_known(id: &str) -> bool {
        Self::from_id(id).is_some()
    }

    /// Lenient parse: unknown ids are passed through with a warning so
    /// forward-compatible callers keep working.
    pub fn parse_lenient(id: &str) -> String {
        if !Self::is_known(id) {
            tracing::warn!(agent_type = %id, "unknown agent type");
        }
        id.to_string()
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourteen_known_roles() {
        assert_eq!(AgentRole::ALL.len(), 14);
    }

    #[test]
    fn id_roundtrip() {
        for role in AgentRole::ALL {
            assert_eq!(AgentRole::from_id(role.as_str()), Some(role));
        }
    }

    #[test]
    fn lenient_parse_passes_unknown_through() {
        assert_eq!(AgentRole::parse_lenient("navigator"), "navigator");
        assert!(!AgentRole::is_known("navigator"));
    }
}

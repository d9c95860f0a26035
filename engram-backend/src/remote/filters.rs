//! Cypher rendering of the isolation predicate. Queries bind the aliases
//! `m` (memory), `at` (owning agent type), and `scope` (scope target).

use neo4rs::Query;

use engram_core::constants::GLOBAL_PROJECT_ID;
use engram_core::models::IsolationFilter;

/// WHERE fragment for the visibility predicate.
pub fn isolation_fragment(filter: &IsolationFilter) -> String {
    let mut clauses: Vec<String> = vec!["NOT m:Archived".to_string()];

    if filter.include_global {
        clauses.push(format!(
            "((scope:Project AND scope.id = $project_id) \
             OR scope:AgentType \
             OR scope.id = '{GLOBAL_PROJECT_ID}' \
             OR exists((m)-[:PROMOTED_TO]->(:Project {{id: '{GLOBAL_PROJECT_ID}'}})))"
        ));
    } else {
        clauses.push("(scope:Project AND scope.id = $project_id)".to_string());
    }

    if filter.agent_type.is_some() {
        clauses.push("at.id = $agent_type".to_string());
    }
    if filter.agent_instance_id.is_some() {
        clauses.push("m.agent_instance_id = $agent_instance_id".to_string());
    }
    if filter.created_after.is_some() {
        clauses.push("m.created_at >= $created_after".to_string());
    }
    if filter.min_importance.is_some() {
        clauses.push("m.importance >= $min_importance".to_string());
    }
    if filter
        .memory_types
        .as_ref()
        .is_some_and(|types| !types.is_empty())
    {
        clauses.push("m.memory_type IN $memory_types".to_string());
    }

    clauses.join(" AND ")
}

/// Bind the fragment's parameters onto a query.
pub fn bind_isolation(mut query: Query, filter: &IsolationFilter) -> Query {
    query = query.param("project_id", filter.project_id.as_str());
    if let Some(agent_type) = &filter.agent_type {
        query = query.param("agent_type", agent_type.as_str());
    }
    if let Some(instance_id) = &filter.agent_instance_id {
        query = query.param("agent_instance_id", instance_id.as_str());
    }
    if let Some(cutoff) = filter.created_after {
        query = query.param("created_after", cutoff);
    }
    if let Some(min_importance) = filter.min_importance {
        query = query.param("min_importance", i64::from(min_importance));
    }
    if let Some(types) = &filter.memory_types {
        if !types.is_empty() {
            let names: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();
            query = query.param("memory_types", names);
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_only_fragment_has_no_global_terms() {
        let mut filter = IsolationFilter::for_project("p1");
        filter.include_global = false;
        let fragment = isolation_fragment(&filter);
        assert!(fragment.contains("scope.id = $project_id"));
        assert!(!fragment.contains("PROMOTED_TO"));
    }

    #[test]
    fn global_fragment_admits_universal_scope() {
        let filter = IsolationFilter::for_project("p1");
        let fragment = isolation_fragment(&filter);
        assert!(fragment.contains("scope:AgentType"));
        assert!(fragment.contains("PROMOTED_TO"));
        assert!(fragment.starts_with("NOT m:Archived"));
    }
}

//! SQL rendering of the isolation predicate. Produces a WHERE fragment
//! plus its positional parameters, in appearance order.

use rusqlite::types::Value;

use engram_core::constants::GLOBAL_PROJECT_ID;
use engram_core::models::IsolationFilter;

/// Render the visibility predicate for alias `m`.
///
/// A memory is visible when scoped to the filter's project. With
/// `include_global` it is also visible when universally scoped, scoped
/// to the global project, or promoted to it.
pub fn isolation_clause(filter: &IsolationFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    clauses.push("m.archived = 0".to_string());

    if filter.include_global {
        clauses.push(
            "((m.scope_kind = 'project' AND m.scope_id = ?) \
             OR m.scope_kind = 'agent_type' \
             OR m.scope_id = ? \
             OR EXISTS (SELECT 1 FROM memory_promotions mp \
                        WHERE mp.memory_id = m.id AND mp.project_id = ?))"
                .to_string(),
        );
        params.push(Value::Text(filter.project_id.clone()));
        params.push(Value::Text(GLOBAL_PROJECT_ID.to_string()));
        params.push(Value::Text(GLOBAL_PROJECT_ID.to_string()));
    } else {
        clauses.push("(m.scope_kind = 'project' AND m.scope_id = ?)".to_string());
        params.push(Value::Text(filter.project_id.clone()));
    }

    if let Some(agent_type) = &filter.agent_type {
        clauses.push("m.agent_type = ?".to_string());
        params.push(Value::Text(agent_type.clone()));
    }

    if let Some(instance_id) = &filter.agent_instance_id {
        clauses.push("m.agent_instance_id = ?".to_string());
        params.push(Value::Text(instance_id.clone()));
    }

    if let Some(cutoff) = filter.created_after {
        clauses.push("m.created_at >= ?".to_string());
        params.push(Value::Integer(cutoff));
    }

    if let Some(min_importance) = filter.min_importance {
        clauses.push("m.importance >= ?".to_string());
        params.push(Value::Integer(i64::from(min_importance)));
    }

    if let Some(types) = &filter.memory_types {
        if !types.is_empty() {
            let placeholders = vec!["?"; types.len()].join(", ");
            clauses.push(format!("m.memory_type IN ({placeholders})"));
            for t in types {
                params.push(Value::Text(t.as_str().to_string()));
            }
        }
    }

    (clauses.join(" AND "), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::MemoryType;

    #[test]
    fn project_only_filter_binds_one_param() {
        let mut filter = IsolationFilter::for_project("p1");
        filter.include_global = false;
        let (clause, params) = isolation_clause(&filter);
        assert!(clause.contains("m.scope_id = ?"));
        assert!(!clause.contains("memory_promotions"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn global_filter_admits_universal_and_promoted() {
        let filter = IsolationFilter::for_project("p1");
        let (clause, params) = isolation_clause(&filter);
        assert!(clause.contains("m.scope_kind = 'agent_type'"));
        assert!(clause.contains("memory_promotions"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn memory_types_render_placeholders() {
        let mut filter = IsolationFilter::for_project("p1");
        filter.memory_types = Some(vec![MemoryType::Procedural, MemoryType::Episodic]);
        let (clause, params) = isolation_clause(&filter);
        assert!(clause.contains("m.memory_type IN (?, ?)"));
        assert_eq!(params.len(), 5);
    }
}

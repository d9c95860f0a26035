//! The full constraint, index, and seed tables for the memory graph.

use engram_core::memory::AgentRole;
use engram_core::models::{AgentTypeSeed, ConstraintDef, IndexDef};

/// Uniqueness constraints, one per natural key.
pub const CONSTRAINTS: &[ConstraintDef] = &[
    ConstraintDef { name: "agent_type_id", label: "AgentType", property: "id" },
    ConstraintDef { name: "project_id", label: "Project", property: "id" },
    ConstraintDef { name: "memory_id", label: "Memory", property: "id" },
    ConstraintDef { name: "codebase_unique_key", label: "Codebase", property: "unique_key" },
    ConstraintDef { name: "ingestion_id", label: "Ingestion", property: "ingestion_id" },
    ConstraintDef { name: "code_file_path", label: "CodeFile", property: "path" },
    ConstraintDef { name: "class_id", label: "Class", property: "id" },
    ConstraintDef { name: "function_id", label: "Function", property: "id" },
    ConstraintDef { name: "doc_file_path", label: "DocFile", property: "path" },
    ConstraintDef { name: "section_id", label: "Section", property: "id" },
    ConstraintDef { name: "concept_id", label: "Concept", property: "id" },
    ConstraintDef { name: "external_doc_url", label: "ExternalDoc", property: "url" },
    ConstraintDef { name: "api_reference_id", label: "APIReference", property: "id" },
    ConstraintDef {
        name: "code_index_metadata_project_root",
        label: "CodeIndexMetadata",
        property: "project_root",
    },
];

/// Performance indexes.
pub const INDEXES: &[IndexDef] = &[
    IndexDef { name: "memory_type", label: "Memory", property: "memory_type" },
    IndexDef { name: "memory_created_at", label: "Memory", property: "created_at" },
    IndexDef { name: "agent_type_name", label: "AgentType", property: "name" },
    IndexDef { name: "project_path", label: "Project", property: "path" },
    IndexDef { name: "code_file_language", label: "CodeFile", property: "language" },
    IndexDef { name: "function_name", label: "Function", property: "name" },
    IndexDef { name: "class_name", label: "Class", property: "name" },
    IndexDef { name: "concept_name", label: "Concept", property: "name" },
    IndexDef { name: "concept_category", label: "Concept", property: "category" },
    IndexDef { name: "doc_file_title", label: "DocFile", property: "title" },
    IndexDef { name: "section_heading", label: "Section", property: "heading" },
    IndexDef { name: "external_doc_source", label: "ExternalDoc", property: "source" },
    IndexDef { name: "external_doc_version", label: "ExternalDoc", property: "version" },
    IndexDef { name: "external_doc_trust_score", label: "ExternalDoc", property: "trust_score" },
    IndexDef { name: "external_doc_fetched_at", label: "ExternalDoc", property: "fetched_at" },
    IndexDef { name: "api_reference_name", label: "APIReference", property: "name" },
    IndexDef {
        name: "code_index_metadata_last_updated",
        label: "CodeIndexMetadata",
        property: "last_updated",
    },
];

/// The fourteen seeded agent types.
pub fn agent_type_seeds() -> Vec<AgentTypeSeed> {
    AgentRole::ALL
        .into_iter()
        .map(|role| AgentTypeSeed {
            id: role.as_str(),
            name: role.display_name(),
            description: role.description(),
        })
        .collect()
}

use serde::{Deserialize, Serialize};

/// Code-graph ingestion bundle, as produced by the code parsing tools.
/// Unknown input keys are ignored; missing sections default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeBundle {
    pub files: Vec<CodeFileRecord>,
    pub classes: Vec<ClassRecord>,
    pub functions: Vec<FunctionRecord>,
    pub imports: Vec<ImportRecord>,
    pub relationships: Vec<CodeRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeFileRecord {
    pub path: String,
    pub language: Option<String>,
    pub project_id: Option<String>,
}

impl Default for CodeFileRecord {
    fn default() -> Self {
        Self {
            path: String::new(),
            language: None,
            project_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionRecord {
    pub id: String,
    pub name: String,
    pub file_path: Option<String>,
    pub class_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRecord {
    pub source_path: String,
    pub target_path: String,
    pub symbol: Option<String>,
    pub alias: Option<String>,
}

/// Relationship kinds carried in the bundle's `relationships` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRelationKind {
    Calls,
    Inherits,
    MethodOf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRelationship {
    pub kind: CodeRelationKind,
    pub source_id: String,
    pub target_id: String,
}

/// Per-section counts from one bundle ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeIngestCounts {
    pub files: u64,
    pub classes: u64,
    pub functions: u64,
    pub imports: u64,
    pub relationships: u64,
}

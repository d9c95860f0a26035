use serde::{Deserialize, Serialize};

/// Parsed markdown document, ready for graph ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDoc {
    pub path: String,
    /// First level-1 heading, or "Untitled".
    pub title: String,
    pub content: String,
    pub sections: Vec<DocSection>,
    pub concepts: Vec<DocConcept>,
    pub code_references: Vec<CodeReference>,
    pub links: Vec<DocLink>,
    pub line_count: u64,
    pub word_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSection {
    pub heading: String,
    /// Heading depth 1..=6.
    pub level: u8,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocConcept {
    pub name: String,
    /// `section`, `emphasized`, or `language`.
    pub category: String,
}

impl DocConcept {
    /// Deterministic id: `<category>:<name>`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.category, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReference {
    pub file: String,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLink {
    pub text: String,
    pub url: String,
}

/// Node counts from one documentation import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocIngestCounts {
    pub doc_files: u64,
    pub sections: u64,
    pub concepts: u64,
    pub code_refs: u64,
}

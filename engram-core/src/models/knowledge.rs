use serde::{Deserialize, Serialize};

use crate::constants::KNOWLEDGE_TTL_HOURS;

/// Supported external knowledge sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgeSource {
    PythonDocs,
    MsLearn,
    Github,
    LibraryDocs,
    Custom,
}

impl KnowledgeSource {
    pub fn as_str(self) -> &'static str {
        match self {
            KnowledgeSource::PythonDocs => "python-docs",
            KnowledgeSource::MsLearn => "ms-learn",
            KnowledgeSource::Github => "github",
            KnowledgeSource::LibraryDocs => "library-docs",
            KnowledgeSource::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "python-docs" => Some(KnowledgeSource::PythonDocs),
            "ms-learn" => Some(KnowledgeSource::MsLearn),
            "github" => Some(KnowledgeSource::Github),
            "library-docs" => Some(KnowledgeSource::LibraryDocs),
            "custom" => Some(KnowledgeSource::Custom),
            _ => None,
        }
    }
}

/// An external documentation record, cached on disk and mirrored in the
/// graph. `metadata` is an opaque JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDocRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub source: KnowledgeSource,
    pub version: String,
    /// Credibility score in [0, 1].
    pub trust_score: f64,
    pub metadata: String,
    pub fetched_at: i64,
    /// Cache TTL in hours; 0 means no expiry.
    pub ttl_hours: u32,
}

impl ExternalDocRecord {
    /// Whether this record has outlived its TTL at time `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        if self.ttl_hours == 0 {
            return false;
        }
        let expiry = self.fetched_at + i64::from(self.ttl_hours) * crate::time::HOUR_MS;
        now_ms > expiry
    }
}

impl Default for ExternalDocRecord {
    fn default() -> Self {
        Self {
            url: String::new(),
            title: String::new(),
            content: String::new(),
            source: KnowledgeSource::LibraryDocs,
            version: "latest".to_string(),
            trust_score: 0.8,
            metadata: "{}".to_string(),
            fetched_at: 0,
            ttl_hours: KNOWLEDGE_TTL_HOURS,
        }
    }
}

/// How an external doc relates to a code target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalLinkKind {
    Explains,
    Documents,
}

impl ExternalLinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalLinkKind::Explains => "EXPLAINS",
            ExternalLinkKind::Documents => "DOCUMENTS",
        }
    }
}

/// API reference documentation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReferenceRecord {
    pub id: String,
    pub name: String,
    pub signature: String,
    pub doc_url: String,
    pub description: String,
    pub examples: Vec<String>,
    pub source: KnowledgeSource,
    pub version: String,
}

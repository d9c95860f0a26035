//! Code-bundle ingestion. The bundle format is the JSON emitted by the
//! code parsing tools; unknown keys are ignored.

use std::sync::Arc;

use engram_core::errors::EngramResult;
use engram_core::models::{CodeBundle, CodeIngestCounts};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, KnowledgeOps};

pub struct CodeGraphIngestor {
    backend: Arc<dyn GraphBackend>,
}

impl CodeGraphIngestor {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Parse a bundle from its JSON form.
    pub fn parse_bundle(json: &str) -> EngramResult<CodeBundle> {
        Ok(serde_json::from_str(json)?)
    }

    /// Merge a bundle into the graph. Natural-key merges make this
    /// idempotent: re-ingesting the same bundle changes nothing.
    pub async fn ingest(&self, bundle: &CodeBundle) -> EngramResult<CodeIngestCounts> {
        let counts = self.backend.merge_code_bundle(bundle, now_ms()).await?;
        tracing::info!(
            files = counts.files,
            classes = counts.classes,
            functions = counts.functions,
            imports = counts.imports,
            relationships = counts.relationships,
            "code bundle ingested"
        );
        Ok(counts)
    }

    /// Convenience: parse and ingest in one step.
    pub async fn ingest_json(&self, json: &str) -> EngramResult<CodeIngestCounts> {
        let bundle = Self::parse_bundle(json)?;
        self.ingest(&bundle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bundle_with_unknown_keys() {
        let json = r#"{
            "files": [{"path": "src/app.py", "language": "python", "frobnicate": 1}],
            "classes": [],
            "functions": [{"id": "fn:app.main", "name": "main", "file_path": "src/app.py"}],
            "imports": [],
            "relationships": [],
            "extra_section": {"ignored": true}
        }"#;
        let bundle = CodeGraphIngestor::parse_bundle(json).unwrap();
        assert_eq!(bundle.files.len(), 1);
        assert_eq!(bundle.functions[0].name, "main");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let bundle = CodeGraphIngestor::parse_bundle(r#"{"files": []}"#).unwrap();
        assert!(bundle.classes.is_empty());
        assert!(bundle.relationships.is_empty());
    }
}

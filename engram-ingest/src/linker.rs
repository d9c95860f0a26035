//! Heuristic linking sweeps between memories and the code/doc graphs.
//!
//! Memory→file links come from a path recorded in the memory's metadata;
//! memory→function links from the content mentioning the function name.

use std::sync::Arc;

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_core::traits::{GraphBackend, KnowledgeOps};

/// Metadata keys that may carry a file path.
const PATH_KEYS: [&str; 3] = ["file", "path", "file_path"];

/// Function names shorter than this create too many false links.
const MIN_FUNCTION_NAME_LEN: usize = 4;

pub struct KnowledgeLinker {
    backend: Arc<dyn GraphBackend>,
}

impl KnowledgeLinker {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Link one memory to code files named in its metadata and functions
    /// named in its content. Returns the number of links created.
    pub async fn link_memory(&self, memory: &MemoryRecord) -> EngramResult<u64> {
        let mut created = 0u64;

        if let Some(path) = metadata_path(&memory.metadata) {
            for file in self.backend.list_code_files().await? {
                if file.path.contains(&path) || path.contains(&file.path) {
                    if self
                        .backend
                        .link_memory_to_file(&memory.id, &file.path)
                        .await?
                    {
                        created += 1;
                    }
                }
            }
        }

        let content_lower = memory.content.to_lowercase();
        for function in self.backend.list_functions().await? {
            if function.name.len() < MIN_FUNCTION_NAME_LEN {
                continue;
            }
            if content_lower.contains(&function.name.to_lowercase()) {
                if self
                    .backend
                    .link_memory_to_function(&memory.id, &function.id)
                    .await?
                {
                    created += 1;
                }
            }
        }

        if created > 0 {
            tracing::debug!(memory_id = %memory.id, links = created, "linked memory to code");
        }
        Ok(created)
    }
}

/// Pull a file path out of the opaque metadata JSON, if present.
fn metadata_path(metadata: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(metadata).ok()?;
    let object = value.as_object()?;
    for key in PATH_KEYS {
        if let Some(path) = object.get(key).and_then(|v| v.as_str()) {
            if !path.is_empty() {
                return Some(path.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_path_checks_known_keys() {
        assert_eq!(
            metadata_path(r#"{"file": "src/app.py"}"#),
            Some("src/app.py".to_string())
        );
        assert_eq!(
            metadata_path(r#"{"file_path": "src/db.py"}"#),
            Some("src/db.py".to_string())
        );
        assert_eq!(metadata_path(r#"{"other": "x"}"#), None);
        assert_eq!(metadata_path("not json"), None);
    }
}

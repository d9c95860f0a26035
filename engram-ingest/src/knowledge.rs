//! External knowledge: HTTP fetching with an on-disk JSON cache, graph
//! mirroring, linking, and TTL cleanup.
//!
//! Cache files are named by the SHA-256 of the URL. The cache directory
//! is not locked; entries are content-addressed and last writer wins.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use sha2::{Digest, Sha256};

use engram_core::errors::EngramResult;
use engram_core::models::{
    ApiReferenceRecord, ExternalDocRecord, ExternalLinkKind, KnowledgeSource,
};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, KnowledgeOps};

/// Hex prefix length used for cache file names.
const CACHE_KEY_LEN: usize = 16;

/// HTTP fetch timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title>(.*?)</title>").expect("static regex"))
}

/// Options for one fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub source: KnowledgeSource,
    pub version: String,
    pub trust_score: f64,
    pub ttl_hours: u32,
    pub force_refresh: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            source: KnowledgeSource::LibraryDocs,
            version: "latest".to_string(),
            trust_score: 0.8,
            ttl_hours: engram_core::constants::KNOWLEDGE_TTL_HOURS,
            force_refresh: false,
        }
    }
}

/// Manages external documentation: fetch, cache, mirror, link.
pub struct ExternalKnowledgeManager {
    backend: Arc<dyn GraphBackend>,
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl ExternalKnowledgeManager {
    pub fn new(backend: Arc<dyn GraphBackend>, cache_dir: &Path) -> EngramResult<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| engram_core::errors::EngramError::Io {
                message: format!("http client: {e}"),
            })?;
        Ok(Self {
            backend,
            cache_dir: cache_dir.to_path_buf(),
            client,
        })
    }

    /// Fetch a document, serving from the disk cache unless it is missing,
    /// expired, or a refresh is forced. Network failures log and return
    /// None rather than erroring.
    pub async fn fetch_api_docs(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Option<ExternalDocRecord> {
        if !options.force_refresh {
            if let Some(cached) = self.read_cached(url) {
                tracing::debug!(url = %url, "using cached doc");
                return Some(cached);
            }
        }

        tracing::info!(url = %url, "fetching external doc");
        let response = match self.client.get(url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "failed to fetch");
                return None;
            }
        };
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "failed to read body");
                return None;
            }
        };

        let metadata = serde_json::json!({
            "content_type": content_type,
            "content_length": body.len(),
        });
        let doc = ExternalDocRecord {
            url: url.to_string(),
            title: extract_title(&body).unwrap_or_else(|| url.to_string()),
            content: body,
            source: options.source,
            version: options.version,
            trust_score: options.trust_score.clamp(0.0, 1.0),
            metadata: metadata.to_string(),
            fetched_at: now_ms(),
            ttl_hours: options.ttl_hours,
        };

        if let Err(e) = self.write_cached(&doc) {
            tracing::warn!(url = %url, error = %e, "failed to cache doc");
        }
        Some(doc)
    }

    /// Mirror a document into the graph (upsert by URL).
    pub async fn store_external_doc(&self, doc: &ExternalDocRecord) -> EngramResult<bool> {
        self.backend.upsert_external_doc(doc, now_ms()).await
    }

    pub async fn link_to_code(
        &self,
        doc_url: &str,
        code_path: &str,
        kind: ExternalLinkKind,
    ) -> EngramResult<bool> {
        self.backend.link_doc_to_code(doc_url, code_path, kind).await
    }

    pub async fn link_to_function(&self, doc_url: &str, function_id: &str) -> EngramResult<bool> {
        self.backend.link_doc_to_function(doc_url, function_id).await
    }

    pub async fn link_to_memory(&self, memory_id: &str, doc_url: &str) -> EngramResult<bool> {
        self.backend.link_memory_source(memory_id, doc_url).await
    }

    pub async fn store_api_reference(
        &self,
        reference: &ApiReferenceRecord,
    ) -> EngramResult<bool> {
        self.backend.upsert_api_reference(reference).await
    }

    /// Query mirrored docs above a trust floor.
    pub async fn query_external_knowledge(
        &self,
        source: Option<KnowledgeSource>,
        min_trust_score: f64,
        limit: usize,
    ) -> EngramResult<Vec<ExternalDocRecord>> {
        self.backend
            .query_external_docs(source, min_trust_score, limit)
            .await
    }

    pub async fn get_doc_by_url(&self, url: &str) -> EngramResult<Option<ExternalDocRecord>> {
        self.backend.external_doc(url).await
    }

    pub async fn get_code_documentation(
        &self,
        code_path: &str,
    ) -> EngramResult<Vec<ExternalDocRecord>> {
        self.backend.docs_for_code(code_path).await
    }

    /// Remove mirrored docs whose TTL expired.
    pub async fn cleanup_expired_docs(&self) -> EngramResult<u64> {
        let deleted = self.backend.cleanup_expired_docs(now_ms()).await?;
        if deleted > 0 {
            tracing::info!(deleted, "removed expired external docs");
        }
        Ok(deleted)
    }

    /// Cache file location for a URL.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.cache_dir.join(format!("{}.json", &digest[..CACHE_KEY_LEN]))
    }

    fn read_cached(&self, url: &str) -> Option<ExternalDocRecord> {
        let path = self.cache_path(url);
        let raw = std::fs::read_to_string(&path).ok()?;
        let doc: ExternalDocRecord = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read cached doc");
                return None;
            }
        };
        if doc.is_expired(now_ms()) {
            tracing::debug!(url = %url, "cached doc expired");
            return None;
        }
        Some(doc)
    }

    fn write_cached(&self, doc: &ExternalDocRecord) -> EngramResult<()> {
        let path = self.cache_path(&doc.url);
        std::fs::write(&path, serde_json::to_string_pretty(doc)?)?;
        tracing::debug!(path = %path.display(), "cached doc");
        Ok(())
    }
}

fn extract_title(html: &str) -> Option<String> {
    title_re()
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_extraction() {
        assert_eq!(
            extract_title("<html><title> Retry Docs </title></html>"),
            Some("Retry Docs".to_string())
        );
        assert_eq!(extract_title("<html><body>no title</body></html>"), None);
    }

    #[test]
    fn expiry_follows_ttl() {
        let doc = ExternalDocRecord {
            fetched_at: 0,
            ttl_hours: 1,
            ..Default::default()
        };
        assert!(!doc.is_expired(engram_core::time::HOUR_MS));
        assert!(doc.is_expired(engram_core::time::HOUR_MS + 1));

        let immortal = ExternalDocRecord {
            fetched_at: 0,
            ttl_hours: 0,
            ..Default::default()
        };
        assert!(!immortal.is_expired(i64::MAX));
    }
}

//! Markdown documentation parsing and graph ingestion.
//!
//! Recognized patterns: ATX headings, fenced code-block languages, bold
//! emphasis, markdown links, and code references (`@path`, `path:line`,
//! backticked paths).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use engram_core::errors::EngramResult;
use engram_core::models::{
    CodeReference, DocConcept, DocIngestCounts, DocLink, DocSection, ParsedDoc,
};
use engram_core::time::now_ms;
use engram_core::traits::{GraphBackend, KnowledgeOps};

/// Headings too generic to count as concepts.
const GENERIC_HEADINGS: [&str; 4] = ["overview", "introduction", "summary", "conclusion"];

/// Bold phrases shorter than this are noise, not concepts.
const MIN_CONCEPT_LEN: usize = 4;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("static regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("static regex"))
}

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(\w+)").expect("static regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("static regex"))
}

fn at_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([\w/.\-_]+\.\w+)").expect("static regex"))
}

fn line_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\w/.\-_]+\.\w+):(\d+)").expect("static regex"))
}

fn inline_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([\w/.\-_]+\.\w+)`").expect("static regex"))
}

/// Parse markdown content into its structured form. `path` is recorded
/// verbatim as the document's natural key.
pub fn parse_markdown(path: &str, content: &str) -> ParsedDoc {
    let sections = parse_sections(content);
    let concepts = extract_concepts(content, &sections);
    let code_references = extract_code_references(content);
    let links = extract_links(content);

    ParsedDoc {
        path: path.to_string(),
        title: extract_title(content),
        content: content.to_string(),
        line_count: content.lines().count() as u64,
        word_count: content.split_whitespace().count() as u64,
        sections,
        concepts,
        code_references,
        links,
    }
}

fn extract_title(content: &str) -> String {
    for line in content.lines() {
        if let Some(caps) = heading_re().captures(line) {
            if caps[1].len() == 1 {
                return caps[2].trim().to_string();
            }
        }
    }
    "Untitled".to_string()
}

fn parse_sections(content: &str) -> Vec<DocSection> {
    let mut sections = Vec::new();
    let mut current: Option<DocSection> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in content.lines() {
        if let Some(caps) = heading_re().captures(line) {
            if let Some(mut section) = current.take() {
                section.content = body.join("\n").trim().to_string();
                sections.push(section);
            }
            body.clear();
            current = Some(DocSection {
                heading: caps[2].trim().to_string(),
                level: caps[1].len() as u8,
                content: String::new(),
            });
        } else if current.is_some() {
            body.push(line);
        }
    }
    if let Some(mut section) = current {
        section.content = body.join("\n").trim().to_string();
        sections.push(section);
    }
    sections
}

fn extract_concepts(content: &str, sections: &[DocSection]) -> Vec<DocConcept> {
    let mut concepts = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for section in sections {
        let heading = section.heading.as_str();
        if GENERIC_HEADINGS.contains(&heading.to_ascii_lowercase().as_str()) {
            continue;
        }
        if seen.insert(heading.to_string()) {
            concepts.push(DocConcept {
                name: heading.to_string(),
                category: "section".to_string(),
            });
        }
    }

    for caps in bold_re().captures_iter(content) {
        let phrase = caps[1].trim().to_string();
        if phrase.len() >= MIN_CONCEPT_LEN && seen.insert(phrase.clone()) {
            concepts.push(DocConcept {
                name: phrase,
                category: "emphasized".to_string(),
            });
        }
    }

    for caps in code_fence_re().captures_iter(content) {
        let language = caps[1].trim().to_string();
        if !language.is_empty() && seen.insert(language.clone()) {
            concepts.push(DocConcept {
                name: language,
                category: "language".to_string(),
            });
        }
    }

    concepts
}

fn extract_code_references(content: &str) -> Vec<CodeReference> {
    let mut references = Vec::new();

    for caps in at_ref_re().captures_iter(content) {
        references.push(CodeReference {
            file: caps[1].to_string(),
            line: None,
        });
    }
    for caps in line_ref_re().captures_iter(content) {
        references.push(CodeReference {
            file: caps[1].to_string(),
            line: caps[2].parse().ok(),
        });
    }
    for caps in inline_ref_re().captures_iter(content) {
        references.push(CodeReference {
            file: caps[1].to_string(),
            line: None,
        });
    }

    references
}

fn extract_links(content: &str) -> Vec<DocLink> {
    link_re()
        .captures_iter(content)
        .map(|caps| DocLink {
            text: caps[1].trim().to_string(),
            url: caps[2].trim().to_string(),
        })
        .collect()
}

/// Imports parsed markdown documents into the graph.
pub struct DocGraphIngestor {
    backend: Arc<dyn GraphBackend>,
}

impl DocGraphIngestor {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Parse and merge one document. Section and concept ids are
    /// deterministic, so re-importing is a no-op.
    pub async fn import_documentation(
        &self,
        path: &str,
        content: &str,
        project_id: Option<&str>,
    ) -> EngramResult<DocIngestCounts> {
        let doc = parse_markdown(path, content);
        let counts = self
            .backend
            .merge_doc_file(&doc, project_id, now_ms())
            .await?;
        tracing::info!(
            path = %path,
            sections = counts.sections,
            concepts = counts.concepts,
            code_refs = counts.code_refs,
            "documentation imported"
        );
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Retry Design

## Overview

Everything retries.

## Backoff Strategy

We use **exponential backoff** with jitter; see @src/retry.py and
`src/breaker.py` for details, or [the RFC](https://example.test/rfc).

```python
def retry():
    pass
```

### Tuning

Start from src/config.py:42 when adjusting thresholds.
";

    #[test]
    fn title_is_first_h1() {
        let doc = parse_markdown("docs/retry.md", SAMPLE);
        assert_eq!(doc.title, "Retry Design");
    }

    #[test]
    fn sections_carry_level_and_content() {
        let doc = parse_markdown("docs/retry.md", SAMPLE);
        let headings: Vec<(&str, u8)> = doc
            .sections
            .iter()
            .map(|s| (s.heading.as_str(), s.level))
            .collect();
        assert_eq!(
            headings,
            vec![
                ("Retry Design", 1),
                ("Overview", 2),
                ("Backoff Strategy", 2),
                ("Tuning", 3),
            ]
        );
        assert!(doc.sections[1].content.contains("Everything retries."));
    }

    #[test]
    fn concepts_skip_generic_headings() {
        let doc = parse_markdown("docs/retry.md", SAMPLE);
        let names: Vec<&str> = doc.concepts.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Backoff Strategy"));
        assert!(!names.contains(&"Overview"));
        assert!(names.contains(&"exponential backoff"));
        assert!(names.contains(&"python"));
    }

    #[test]
    fn concept_ids_are_category_qualified() {
        let concept = DocConcept {
            name: "python".to_string(),
            category: "language".to_string(),
        };
        assert_eq!(concept.id(), "language:python");
    }

    #[test]
    fn code_references_cover_all_three_patterns() {
        let doc = parse_markdown("docs/retry.md", SAMPLE);
        let files: Vec<(&str, Option<u32>)> = doc
            .code_references
            .iter()
            .map(|r| (r.file.as_str(), r.line))
            .collect();
        assert!(files.contains(&("src/retry.py", None)));
        assert!(files.contains(&("src/breaker.py", None)));
        assert!(files.contains(&("src/config.py", Some(42))));
    }

    #[test]
    fn links_are_extracted() {
        let doc = parse_markdown("docs/retry.md", SAMPLE);
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].text, "the RFC");
        assert_eq!(doc.links[0].url, "https://example.test/rfc");
    }

    #[test]
    fn untitled_without_h1() {
        let doc = parse_markdown("x.md", "just text\n");
        assert_eq!(doc.title, "Untitled");
        assert!(doc.sections.is_empty());
    }
}

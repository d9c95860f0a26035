//! Code, documentation, and external-knowledge subgraphs as parameterized
//! Cypher. All merges upsert on the natural key.

use async_trait::async_trait;
use neo4rs::Query;

use engram_core::errors::EngramResult;
use engram_core::models::{
    ApiReferenceRecord, CodeBundle, CodeFileRecord, CodeIngestCounts, CodeRelationKind,
    DocIngestCounts, ExternalDocRecord, ExternalLinkKind, FunctionRecord, KnowledgeSource,
    ParsedDoc,
};
use engram_core::traits::KnowledgeOps;

use super::rows::{opt, req, row_to_external_doc, EXTERNAL_DOC_RETURN};
use super::RemoteBackend;

fn relation_cypher(kind: CodeRelationKind) -> &'static str {
    match kind {
        CodeRelationKind::Calls => {
            "MATCH (a:Function {id: $source_id}), (b:Function {id: $target_id})
             MERGE (a)-[:CALLS]->(b)"
        }
        CodeRelationKind::Inherits => {
            "MATCH (a:Class {id: $source_id}), (b:Class {id: $target_id})
             MERGE (a)-[:INHERITS]->(b)"
        }
        CodeRelationKind::MethodOf => {
            "MATCH (a:Function {id: $source_id}), (b:Class {id: $target_id})
             MERGE (a)-[:METHOD_OF]->(b)"
        }
    }
}

#[async_trait]
impl KnowledgeOps for RemoteBackend {
    async fn merge_code_bundle(
        &self,
        bundle: &CodeBundle,
        now_ms: i64,
    ) -> EngramResult<CodeIngestCounts> {
        let mut counts = CodeIngestCounts::default();

        for file in &bundle.files {
            if file.path.is_empty() {
                continue;
            }
            let language_term = if file.language.is_some() {
                "$language"
            } else {
                "null"
            };
            let mut cypher = format!(
                "MERGE (cf:CodeFile {{path: $path}})
                 ON CREATE SET cf.created_at = $now
                 SET cf.language = {language_term}"
            );
            if file.project_id.is_some() {
                cypher.push_str(
                    " MERGE (p:Project {id: $project_id})
                      ON CREATE SET p.created_at = $now
                      MERGE (cf)-[:BELONGS_TO_PROJECT]->(p)",
                );
            }
            cypher.push_str(" RETURN cf.path as path");
            let mut query = Query::new(cypher)
                .param("path", file.path.as_str())
                .param("now", now_ms);
            if let Some(language) = &file.language {
                query = query.param("language", language.as_str());
            }
            if let Some(project) = &file.project_id {
                query = query.param("project_id", project.as_str());
            }
            self.run_write(query).await?;
            counts.files += 1;
        }

        for class in &bundle.classes {
            let mut cypher = String::from(
                "MERGE (c:Class {id: $id})
                 SET c.name = $name",
            );
            if class.file_path.is_some() {
                cypher.push_str(
                    " WITH c
                      MATCH (cf:CodeFile {path: $file_path})
                      MERGE (c)-[:DEFINED_IN]->(cf)",
                );
            }
            cypher.push_str(" RETURN c.id as id");
            let mut query = Query::new(cypher)
                .param("id", class.id.as_str())
                .param("name", class.name.as_str());
            if let Some(path) = &class.file_path {
                query = query.param("file_path", path.as_str());
            }
            self.run_write(query).await?;
            counts.classes += 1;
        }

        for function in &bundle.functions {
            let signature_term = if function.signature.is_some() {
                "$signature"
            } else {
                "null"
            };
            let mut cypher = format!(
                "MERGE (f:Function {{id: $id}})
                 SET f.name = $name, f.signature = {signature_term}"
            );
            if function.file_path.is_some() {
                cypher.push_str(
                    " WITH f
                      MATCH (cf:CodeFile {path: $file_path})
                      MERGE (f)-[:DEFINED_IN]->(cf)",
                );
            }
            if function.class_id.is_some() {
                cypher.push_str(
                    " WITH f
                      MATCH (c:Class {id: $class_id})
                      MERGE (f)-[:METHOD_OF]->(c)",
                );
            }
            cypher.push_str(" RETURN f.id as id");
            let mut query = Query::new(cypher)
                .param("id", function.id.as_str())
                .param("name", function.name.as_str());
            if let Some(signature) = &function.signature {
                query = query.param("signature", signature.as_str());
            }
            if let Some(path) = &function.file_path {
                query = query.param("file_path", path.as_str());
            }
            if let Some(class_id) = &function.class_id {
                query = query.param("class_id", class_id.as_str());
            }
            self.run_write(query).await?;
            counts.functions += 1;
        }

        for import in &bundle.imports {
            let alias_term = if import.alias.is_some() {
                "$alias"
            } else {
                "null"
            };
            let cypher = format!(
                "MATCH (a:CodeFile {{path: $source_path}}), (b:CodeFile {{path: $target_path}})
                 MERGE (a)-[imp:IMPORTS {{symbol: $symbol}}]->(b)
                 SET imp.alias = {alias_term}
                 RETURN a.path as path"
            );
            let mut query = Query::new(cypher)
                .param("source_path", import.source_path.as_str())
                .param("target_path", import.target_path.as_str())
                .param("symbol", import.symbol.as_deref().unwrap_or(""));
            if let Some(alias) = &import.alias {
                query = query.param("alias", alias.as_str());
            }
            self.run_write(query).await?;
            counts.imports += 1;
        }

        for relation in &bundle.relationships {
            let query = Query::new(format!("{} RETURN 1 as ok", relation_cypher(relation.kind)))
                .param("source_id", relation.source_id.as_str())
                .param("target_id", relation.target_id.as_str());
            self.run_write(query).await?;
            counts.relationships += 1;
        }

        Ok(counts)
    }

    async fn merge_doc_file(
        &self,
        doc: &ParsedDoc,
        project_id: Option<&str>,
        now_ms: i64,
    ) -> EngramResult<DocIngestCounts> {
        let mut counts = DocIngestCounts::default();

        let mut cypher = String::from(
            "MERGE (df:DocFile {path: $path})
             ON CREATE SET df.created_at = $now
             SET df.title = $title,
                 df.content = $content,
                 df.line_count = $line_count,
                 df.word_count = $word_count,
                 df.imported_at = $now",
        );
        if project_id.is_some() {
            cypher.push_str(
                " MERGE (p:Project {id: $project_id})
                  ON CREATE SET p.created_at = $now
                  MERGE (df)-[:BELONGS_TO_PROJECT]->(p)",
            );
        }
        cypher.push_str(" RETURN df.path as path");
        let mut query = Query::new(cypher)
            .param("path", doc.path.as_str())
            .param("title", doc.title.as_str())
            .param("content", doc.content.as_str())
            .param("line_count", doc.line_count as i64)
            .param("word_count", doc.word_count as i64)
            .param("now", now_ms);
        if let Some(project) = project_id {
            query = query.param("project_id", project);
        }
        self.run_write(query).await?;
        counts.doc_files = 1;

        for (index, section) in doc.sections.iter().enumerate() {
            let section_id = format!("{}#section-{}", doc.path, index);
            let query = Query::new(
                "MATCH (df:DocFile {path: $doc_path})
                 MERGE (s:Section {id: $id})
                 ON CREATE SET s.created_at = $now
                 SET s.heading = $heading,
                     s.level = $level,
                     s.content = $content,
                     s.order = $order
                 MERGE (df)-[:HAS_SECTION]->(s)
                 RETURN s.id as id"
                    .to_string(),
            )
            .param("doc_path", doc.path.as_str())
            .param("id", section_id.as_str())
            .param("heading", section.heading.as_str())
            .param("level", i64::from(section.level))
            .param("content", section.content.as_str())
            .param("order", index as i64)
            .param("now", now_ms);
            self.run_write(query).await?;
            counts.sections += 1;
        }

        for concept in &doc.concepts {
            let query = Query::new(
                "MATCH (df:DocFile {path: $doc_path})
                 MERGE (c:Concept {id: $id})
                 ON CREATE SET c.created_at = $now
                 SET c.name = $name, c.category = $category
                 MERGE (df)-[:DEFINES]->(c)
                 RETURN c.id as id"
                    .to_string(),
            )
            .param("doc_path", doc.path.as_str())
            .param("id", concept.id().as_str())
            .param("name", concept.name.as_str())
            .param("category", concept.category.as_str())
            .param("now", now_ms);
            self.run_write(query).await?;

            // Concepts attach to code by case-insensitive name match or
            // containment.
            let link = Query::new(
                "MATCH (c:Concept {id: $id})
                 OPTIONAL MATCH (f:Function)
                 WHERE toLower(f.name) = toLower($name)
                    OR toLower($name) CONTAINS toLower(f.name)
                 FOREACH (t IN CASE WHEN f IS NULL THEN [] ELSE [f] END |
                     MERGE (c)-[:IMPLEMENTED_IN]->(t)
                 )
                 WITH DISTINCT c
                 OPTIONAL MATCH (cl:Class)
                 WHERE toLower(cl.name) = toLower($name)
                    OR toLower($name) CONTAINS toLower(cl.name)
                 FOREACH (t IN CASE WHEN cl IS NULL THEN [] ELSE [cl] END |
                     MERGE (c)-[:IMPLEMENTED_IN]->(t)
                 )
                 RETURN count(c) as linked"
                    .to_string(),
            )
            .param("id", concept.id().as_str())
            .param("name", concept.name.as_str());
            self.run_write(link).await?;
            counts.concepts += 1;
        }

        for reference in &doc.code_references {
            let line_term = if reference.line.is_some() {
                "$line"
            } else {
                "null"
            };
            let cypher = format!(
                "MATCH (df:DocFile {{path: $doc_path}})
                 MATCH (cf:CodeFile)
                 WHERE cf.path CONTAINS $file
                 MERGE (df)-[r:REFERENCES {{file: $file}}]->(cf)
                 SET r.line = {line_term}
                 RETURN count(cf) as linked"
            );
            let mut query = Query::new(cypher)
                .param("doc_path", doc.path.as_str())
                .param("file", reference.file.as_str());
            if let Some(line) = reference.line {
                query = query.param("line", i64::from(line));
            }
            let rows = self.run_write(query).await?;
            if let Some(row) = rows.first() {
                counts.code_refs += req::<i64>(row, "linked")? as u64;
            }
        }

        Ok(counts)
    }

    async fn upsert_external_doc(
        &self,
        doc: &ExternalDocRecord,
        now_ms: i64,
    ) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MERGE (ed:ExternalDoc {url: $url})
                     SET ed.title = $title,
                         ed.content = $content,
                         ed.source = $source,
                         ed.version = $version,
                         ed.trust_score = $trust_score,
                         ed.metadata = $metadata,
                         ed.fetched_at = $fetched_at,
                         ed.ttl_hours = $ttl_hours,
                         ed.updated_at = $now
                     RETURN ed.url as url"
                        .to_string(),
                )
                .param("url", doc.url.as_str())
                .param("title", doc.title.as_str())
                .param("content", doc.content.as_str())
                .param("source", doc.source.as_str())
                .param("version", doc.version.as_str())
                .param("trust_score", doc.trust_score)
                .param("metadata", doc.metadata.as_str())
                .param("fetched_at", doc.fetched_at)
                .param("ttl_hours", i64::from(doc.ttl_hours))
                .param("now", now_ms),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn link_doc_to_code(
        &self,
        doc_url: &str,
        code_path: &str,
        kind: ExternalLinkKind,
    ) -> EngramResult<bool> {
        let cypher = format!(
            "MATCH (ed:ExternalDoc {{url: $url}}), (cf:CodeFile {{path: $path}})
             MERGE (ed)-[:{}]->(cf)
             RETURN count(cf) as linked",
            kind.as_str()
        );
        let rows = self
            .run_write(
                Query::new(cypher)
                    .param("url", doc_url)
                    .param("path", code_path),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "linked")? > 0),
            None => Ok(false),
        }
    }

    async fn link_doc_to_function(&self, doc_url: &str, function_id: &str) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (ed:ExternalDoc {url: $url}), (f:Function {id: $function_id})
                     MERGE (ed)-[:DOCUMENTS]->(f)
                     RETURN count(f) as linked"
                        .to_string(),
                )
                .param("url", doc_url)
                .param("function_id", function_id),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "linked")? > 0),
            None => Ok(false),
        }
    }

    async fn link_memory_source(&self, memory_id: &str, doc_url: &str) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (m:Memory {id: $memory_id}), (ed:ExternalDoc {url: $url})
                     MERGE (m)-[:SOURCED_FROM]->(ed)
                     RETURN count(ed) as linked"
                        .to_string(),
                )
                .param("memory_id", memory_id)
                .param("url", doc_url),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "linked")? > 0),
            None => Ok(false),
        }
    }

    async fn link_memory_to_file(&self, memory_id: &str, code_path: &str) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (m:Memory {id: $memory_id}), (cf:CodeFile {path: $path})
                     MERGE (m)-[:RELATES_TO_FILE]->(cf)
                     RETURN count(cf) as linked"
                        .to_string(),
                )
                .param("memory_id", memory_id)
                .param("path", code_path),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "linked")? > 0),
            None => Ok(false),
        }
    }

    async fn link_memory_to_function(
        &self,
        memory_id: &str,
        function_id: &str,
    ) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (m:Memory {id: $memory_id}), (f:Function {id: $function_id})
                     MERGE (m)-[:RELATES_TO_FUNCTION]->(f)
                     RETURN count(f) as linked"
                        .to_string(),
                )
                .param("memory_id", memory_id)
                .param("function_id", function_id),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "linked")? > 0),
            None => Ok(false),
        }
    }

    async fn link_memory_to_doc(&self, memory_id: &str, doc_path: &str) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (m:Memory {id: $memory_id}), (df:DocFile {path: $path})
                     MERGE (m)-[:DOCUMENTED_IN]->(df)
                     RETURN count(df) as linked"
                        .to_string(),
                )
                .param("memory_id", memory_id)
                .param("path", doc_path),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "linked")? > 0),
            None => Ok(false),
        }
    }

    async fn upsert_api_reference(&self, reference: &ApiReferenceRecord) -> EngramResult<bool> {
        let rows = self
            .run_write(
                Query::new(
                    "MERGE (ar:APIReference {id: $id})
                     SET ar.name = $name,
                         ar.signature = $signature,
                         ar.doc_url = $doc_url,
                         ar.description = $description,
                         ar.examples = $examples,
                         ar.source = $source,
                         ar.version = $version
                     RETURN ar.id as id"
                        .to_string(),
                )
                .param("id", reference.id.as_str())
                .param("name", reference.name.as_str())
                .param("signature", reference.signature.as_str())
                .param("doc_url", reference.doc_url.as_str())
                .param("description", reference.description.as_str())
                .param("examples", reference.examples.clone())
                .param("source", reference.source.as_str())
                .param("version", reference.version.as_str()),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn query_external_docs(
        &self,
        source: Option<KnowledgeSource>,
        min_trust_score: f64,
        limit: usize,
    ) -> EngramResult<Vec<ExternalDocRecord>> {
        let mut cypher = String::from(
            "MATCH (ed:ExternalDoc)
             WHERE ed.trust_score >= $min_trust",
        );
        if source.is_some() {
            cypher.push_str(" AND ed.source = $source");
        }
        cypher.push_str(&format!(
            " RETURN {EXTERNAL_DOC_RETURN}
              ORDER BY ed.trust_score DESC, ed.fetched_at DESC
              LIMIT $limit"
        ));
        let mut query = Query::new(cypher)
            .param("min_trust", min_trust_score)
            .param("limit", limit as i64);
        if let Some(source) = source {
            query = query.param("source", source.as_str());
        }

        let rows = self.run_read(query).await?;
        rows.iter().map(row_to_external_doc).collect()
    }

    async fn external_doc(&self, url: &str) -> EngramResult<Option<ExternalDocRecord>> {
        let cypher = format!(
            "MATCH (ed:ExternalDoc {{url: $url}}) RETURN {EXTERNAL_DOC_RETURN}"
        );
        let rows = self.run_read(Query::new(cypher).param("url", url)).await?;
        rows.first().map(row_to_external_doc).transpose()
    }

    async fn docs_for_code(&self, code_path: &str) -> EngramResult<Vec<ExternalDocRecord>> {
        let cypher = format!(
            "MATCH (ed:ExternalDoc)-[:EXPLAINS|DOCUMENTS]->(cf:CodeFile {{path: $path}})
             RETURN {EXTERNAL_DOC_RETURN}
             ORDER BY ed.trust_score DESC"
        );
        let rows = self
            .run_read(Query::new(cypher).param("path", code_path))
            .await?;
        rows.iter().map(row_to_external_doc).collect()
    }

    async fn cleanup_expired_docs(&self, now_ms: i64) -> EngramResult<u64> {
        let rows = self
            .run_write(
                Query::new(
                    "MATCH (ed:ExternalDoc)
                     WHERE ed.ttl_hours > 0
                       AND ed.fetched_at + ed.ttl_hours * 3600000 < $now
                     DETACH DELETE ed
                     RETURN count(ed) as deleted"
                        .to_string(),
                )
                .param("now", now_ms),
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(req::<i64>(row, "deleted")? as u64),
            None => Ok(0),
        }
    }

    async fn list_code_files(&self) -> EngramResult<Vec<CodeFileRecord>> {
        let rows = self
            .run_read(Query::new(
                "MATCH (cf:CodeFile)
                 OPTIONAL MATCH (cf)-[:BELONGS_TO_PROJECT]->(p:Project)
                 RETURN cf.path as path, cf.language as language, p.id as project_id
                 ORDER BY cf.path"
                    .to_string(),
            ))
            .await?;
        rows.iter()
            .map(|row| {
                Ok(CodeFileRecord {
                    path: req(row, "path")?,
                    language: opt(row, "language"),
                    project_id: opt(row, "project_id"),
                })
            })
            .collect()
    }

    async fn list_functions(&self) -> EngramResult<Vec<FunctionRecord>> {
        let rows = self
            .run_read(Query::new(
                "MATCH (f:Function)
                 OPTIONAL MATCH (f)-[:DEFINED_IN]->(cf:CodeFile)
                 OPTIONAL MATCH (f)-[:METHOD_OF]->(c:Class)
                 RETURN f.id as id, f.name as name, f.signature as signature,
                        cf.path as file_path, c.id as class_id
                 ORDER BY f.id"
                    .to_string(),
            ))
            .await?;
        rows.iter()
            .map(|row| {
                Ok(FunctionRecord {
                    id: req(row, "id")?,
                    name: req(row, "name")?,
                    file_path: opt(row, "file_path"),
                    class_id: opt(row, "class_id"),
                    signature: opt(row, "signature"),
                })
            })
            .collect()
    }
}

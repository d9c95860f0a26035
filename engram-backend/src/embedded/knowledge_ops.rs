//! Code, documentation, and external-knowledge subgraphs on the embedded
//! store. All writes are upserts on the natural key.

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, types::Value, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{
    ApiReferenceRecord, CodeBundle, CodeFileRecord, CodeIngestCounts, CodeRelationKind,
    DocIngestCounts, ExternalDocRecord, ExternalLinkKind, FunctionRecord, KnowledgeSource,
    ParsedDoc,
};
use engram_core::traits::KnowledgeOps;

use super::rows::{row_to_external_doc, EXTERNAL_DOC_COLUMNS};
use super::{to_query_err, EmbeddedBackend};

fn relation_kind_str(kind: CodeRelationKind) -> &'static str {
    match kind {
        CodeRelationKind::Calls => "calls",
        CodeRelationKind::Inherits => "inherits",
        CodeRelationKind::MethodOf => "method_of",
    }
}

fn collect_external_docs(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> EngramResult<Vec<ExternalDocRecord>> {
    let mut stmt = conn.prepare(sql).map_err(to_query_err)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| Ok(row_to_external_doc(row)))
        .map_err(to_query_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_query_err)?;
    rows.into_iter().collect()
}

fn insert_link(
    conn: &Connection,
    table: &str,
    columns: &str,
    values: &[&dyn rusqlite::ToSql],
) -> EngramResult<bool> {
    let placeholders = (1..=values.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT OR IGNORE INTO {table} ({columns}) VALUES ({placeholders})");
    let inserted = conn.execute(&sql, values).map_err(to_query_err)?;
    Ok(inserted > 0)
}

#[async_trait]
impl KnowledgeOps for EmbeddedBackend {
    async fn merge_code_bundle(
        &self,
        bundle: &CodeBundle,
        now_ms: i64,
    ) -> EngramResult<CodeIngestCounts> {
        let bundle = bundle.clone();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            let mut counts = CodeIngestCounts::default();

            for file in &bundle.files {
                if file.path.is_empty() {
                    continue;
                }
                if let Some(project) = &file.project_id {
                    tx.execute(
                        "INSERT OR IGNORE INTO projects (id, path, created_at) VALUES (?1, NULL, ?2)",
                        params![project, now_ms],
                    )
                    .map_err(to_query_err)?;
                }
                tx.execute(
                    "INSERT INTO code_files (path, language, project_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(path) DO UPDATE SET
                         language = excluded.language,
                         project_id = COALESCE(excluded.project_id, code_files.project_id)",
                    params![file.path, file.language, file.project_id, now_ms],
                )
                .map_err(to_query_err)?;
                counts.files += 1;
            }

            for class in &bundle.classes {
                tx.execute(
                    "INSERT INTO classes (id, name, file_path) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                         name = excluded.name,
                         file_path = excluded.file_path",
                    params![class.id, class.name, class.file_path],
                )
                .map_err(to_query_err)?;
                counts.classes += 1;
            }

            for function in &bundle.functions {
                tx.execute(
                    "INSERT INTO functions (id, name, file_path, class_id, signature)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                         name = excluded.name,
                         file_path = excluded.file_path,
                         class_id = excluded.class_id,
                         signature = excluded.signature",
                    params![
                        function.id,
                        function.name,
                        function.file_path,
                        function.class_id,
                        function.signature,
                    ],
                )
                .map_err(to_query_err)?;
                counts.functions += 1;
            }

            for import in &bundle.imports {
                tx.execute(
                    "INSERT OR IGNORE INTO code_imports (source_path, target_path, symbol, alias)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        import.source_path,
                        import.target_path,
                        import.symbol,
                        import.alias,
                    ],
                )
                .map_err(to_query_err)?;
                counts.imports += 1;
            }

            for relation in &bundle.relationships {
                tx.execute(
                    "INSERT OR IGNORE INTO code_relations (kind, source_id, target_id)
                     VALUES (?1, ?2, ?3)",
                    params![
                        relation_kind_str(relation.kind),
                        relation.source_id,
                        relation.target_id,
                    ],
                )
                .map_err(to_query_err)?;
                counts.relationships += 1;
            }

            tx.commit().map_err(to_query_err)?;
            Ok(counts)
        })
        .await
    }

    async fn merge_doc_file(
        &self,
        doc: &ParsedDoc,
        project_id: Option<&str>,
        now_ms: i64,
    ) -> EngramResult<DocIngestCounts> {
        let doc = doc.clone();
        let project_id = project_id.map(str::to_string);
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            let mut counts = DocIngestCounts::default();

            tx.execute(
                "INSERT INTO doc_files
                     (path, title, content, line_count, word_count, created_at, imported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(path) DO UPDATE SET
                     title = excluded.title,
                     content = excluded.content,
                     line_count = excluded.line_count,
                     word_count = excluded.word_count,
                     imported_at = excluded.imported_at",
                params![
                    doc.path,
                    doc.title,
                    doc.content,
                    doc.line_count as i64,
                    doc.word_count as i64,
                    now_ms,
                ],
            )
            .map_err(to_query_err)?;
            counts.doc_files = 1;

            if let Some(project) = &project_id {
                tx.execute(
                    "INSERT OR IGNORE INTO projects (id, path, created_at) VALUES (?1, NULL, ?2)",
                    params![project, now_ms],
                )
                .map_err(to_query_err)?;
                tx.execute(
                    "INSERT OR IGNORE INTO doc_projects (doc_path, project_id) VALUES (?1, ?2)",
                    params![doc.path, project],
                )
                .map_err(to_query_err)?;
            }

            for (index, section) in doc.sections.iter().enumerate() {
                let section_id = format!("{}#section-{}", doc.path, index);
                tx.execute(
                    "INSERT INTO sections (id, doc_path, heading, level, content, ord)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                         heading = excluded.heading,
                         level = excluded.level,
                         content = excluded.content,
                         ord = excluded.ord",
                    params![
                        section_id,
                        doc.path,
                        section.heading,
                        i64::from(section.level),
                        section.content,
                        index as i64,
                    ],
                )
                .map_err(to_query_err)?;
                counts.sections += 1;
            }

            for concept in &doc.concepts {
                let concept_id = concept.id();
                tx.execute(
                    "INSERT INTO concepts (id, name, category, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                         name = excluded.name,
                         category = excluded.category",
                    params![concept_id, concept.name, concept.category, now_ms],
                )
                .map_err(to_query_err)?;
                tx.execute(
                    "INSERT OR IGNORE INTO doc_concepts (doc_path, concept_id) VALUES (?1, ?2)",
                    params![doc.path, concept_id],
                )
                .map_err(to_query_err)?;

                // Concepts attach to code by case-insensitive name match or
                // containment.
                tx.execute(
                    "INSERT OR IGNORE INTO concept_impls (concept_id, target_kind, target_id)
                     SELECT ?1, 'function', f.id FROM functions f
                     WHERE lower(f.name) = lower(?2)
                        OR instr(lower(?2), lower(f.name)) > 0",
                    params![concept_id, concept.name],
                )
                .map_err(to_query_err)?;
                tx.execute(
                    "INSERT OR IGNORE INTO concept_impls (concept_id, target_kind, target_id)
                     SELECT ?1, 'class', c.id FROM classes c
                     WHERE lower(c.name) = lower(?2)
                        OR instr(lower(?2), lower(c.name)) > 0",
                    params![concept_id, concept.name],
                )
                .map_err(to_query_err)?;
                counts.concepts += 1;
            }

            // Link references to code files whose stored path contains the
            // referenced path.
            for reference in &doc.code_references {
                let matched: Vec<String> = {
                    let mut stmt = tx
                        .prepare("SELECT path FROM code_files WHERE instr(path, ?1) > 0")
                        .map_err(to_query_err)?;
                    let rows = stmt
                        .query_map(params![reference.file], |row| row.get::<_, String>(0))
                        .map_err(to_query_err)?
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(to_query_err)?;
                    rows
                };
                for file_path in matched {
                    tx.execute(
                        "INSERT OR IGNORE INTO doc_code_refs (doc_path, file_path, line)
                         VALUES (?1, ?2, ?3)",
                        params![doc.path, file_path, reference.line.map(i64::from)],
                    )
                    .map_err(to_query_err)?;
                    counts.code_refs += 1;
                }
            }

            tx.commit().map_err(to_query_err)?;
            Ok(counts)
        })
        .await
    }

    async fn upsert_external_doc(
        &self,
        doc: &ExternalDocRecord,
        now_ms: i64,
    ) -> EngramResult<bool> {
        let doc = doc.clone();
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO external_docs
                     (url, title, content, source, version, trust_score, metadata,
                      fetched_at, ttl_hours, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(url) DO UPDATE SET
                     title = excluded.title,
                     content = excluded.content,
                     source = excluded.source,
                     version = excluded.version,
                     trust_score = excluded.trust_score,
                     metadata = excluded.metadata,
                     fetched_at = excluded.fetched_at,
                     ttl_hours = excluded.ttl_hours,
                     updated_at = excluded.updated_at",
                params![
                    doc.url,
                    doc.title,
                    doc.content,
                    doc.source.as_str(),
                    doc.version,
                    doc.trust_score,
                    doc.metadata,
                    doc.fetched_at,
                    i64::from(doc.ttl_hours),
                    now_ms,
                ],
            )
            .map_err(to_query_err)?;
            Ok(true)
        })
        .await
    }

    async fn link_doc_to_code(
        &self,
        doc_url: &str,
        code_path: &str,
        kind: ExternalLinkKind,
    ) -> EngramResult<bool> {
        let doc_url = doc_url.to_string();
        let code_path = code_path.to_string();
        self.write(move |conn| {
            insert_link(
                conn,
                "external_code_links",
                "doc_url, target_kind, target_id, rel",
                &[&doc_url, &"file", &code_path, &kind.as_str()],
            )
        })
        .await
    }

    async fn link_doc_to_function(&self, doc_url: &str, function_id: &str) -> EngramResult<bool> {
        let doc_url = doc_url.to_string();
        let function_id = function_id.to_string();
        self.write(move |conn| {
            insert_link(
                conn,
                "external_code_links",
                "doc_url, target_kind, target_id, rel",
                &[
                    &doc_url,
                    &"function",
                    &function_id,
                    &ExternalLinkKind::Documents.as_str(),
                ],
            )
        })
        .await
    }

    async fn link_memory_source(&self, memory_id: &str, doc_url: &str) -> EngramResult<bool> {
        let memory_id = memory_id.to_string();
        let doc_url = doc_url.to_string();
        self.write(move |conn| {
            insert_link(
                conn,
                "memory_sources",
                "memory_id, doc_url",
                &[&memory_id, &doc_url],
            )
        })
        .await
    }

    async fn link_memory_to_file(&self, memory_id: &str, code_path: &str) -> EngramResult<bool> {
        let memory_id = memory_id.to_string();
        let code_path = code_path.to_string();
        self.write(move |conn| {
            insert_link(
                conn,
                "memory_code_links",
                "memory_id, kind, target",
                &[&memory_id, &"file", &code_path],
            )
        })
        .await
    }

    async fn link_memory_to_function(
        &self,
        memory_id: &str,
        function_id: &str,
    ) -> EngramResult<bool> {
        let memory_id = memory_id.to_string();
        let function_id = function_id.to_string();
        self.write(move |conn| {
            insert_link(
                conn,
                "memory_code_links",
                "memory_id, kind, target",
                &[&memory_id, &"function", &function_id],
            )
        })
        .await
    }

    async fn link_memory_to_doc(&self, memory_id: &str, doc_path: &str) -> EngramResult<bool> {
        let memory_id = memory_id.to_string();
        let doc_path = doc_path.to_string();
        self.write(move |conn| {
            insert_link(
                conn,
                "memory_code_links",
                "memory_id, kind, target",
                &[&memory_id, &"doc", &doc_path],
            )
        })
        .await
    }

    async fn upsert_api_reference(&self, reference: &ApiReferenceRecord) -> EngramResult<bool> {
        let reference = reference.clone();
        self.write(move |conn| {
            let examples = serde_json::to_string(&reference.examples)?;
            conn.execute(
                "INSERT INTO api_references
                     (id, name, signature, doc_url, description, examples, source, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     signature = excluded.signature,
                     doc_url = excluded.doc_url,
                     description = excluded.description,
                     examples = excluded.examples,
                     source = excluded.source,
                     version = excluded.version",
                params![
                    reference.id,
                    reference.name,
                    reference.signature,
                    reference.doc_url,
                    reference.description,
                    examples,
                    reference.source.as_str(),
                    reference.version,
                ],
            )
            .map_err(to_query_err)?;
            Ok(true)
        })
        .await
    }

    async fn query_external_docs(
        &self,
        source: Option<KnowledgeSource>,
        min_trust_score: f64,
        limit: usize,
    ) -> EngramResult<Vec<ExternalDocRecord>> {
        self.read(move |conn| {
            let mut sql = format!(
                "SELECT {EXTERNAL_DOC_COLUMNS} FROM external_docs WHERE trust_score >= ?"
            );
            let mut params: Vec<Value> = vec![Value::Real(min_trust_score)];
            if let Some(source) = source {
                sql.push_str(" AND source = ?");
                params.push(Value::Text(source.as_str().to_string()));
            }
            sql.push_str(" ORDER BY trust_score DESC, fetched_at DESC LIMIT ?");
            params.push(Value::Integer(limit as i64));
            collect_external_docs(conn, &sql, params)
        })
        .await
    }

    async fn external_doc(&self, url: &str) -> EngramResult<Option<ExternalDocRecord>> {
        let url = url.to_string();
        self.read(move |conn| {
            let sql =
                format!("SELECT {EXTERNAL_DOC_COLUMNS} FROM external_docs WHERE url = ?");
            let docs = collect_external_docs(conn, &sql, vec![Value::Text(url.clone())])?;
            Ok(docs.into_iter().next())
        })
        .await
    }

    async fn docs_for_code(&self, code_path: &str) -> EngramResult<Vec<ExternalDocRecord>> {
        let code_path = code_path.to_string();
        self.read(move |conn| {
            let sql = format!(
                "SELECT {} FROM external_docs ed
                 JOIN external_code_links l ON l.doc_url = ed.url
                 WHERE l.target_kind = 'file' AND l.target_id = ?
                 ORDER BY ed.trust_score DESC",
                EXTERNAL_DOC_COLUMNS
                    .split(", ")
                    .map(|c| format!("ed.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            collect_external_docs(conn, &sql, vec![Value::Text(code_path.clone())])
        })
        .await
    }

    async fn cleanup_expired_docs(&self, now_ms: i64) -> EngramResult<u64> {
        self.write(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM external_docs
                     WHERE ttl_hours > 0 AND fetched_at + ttl_hours * 3600000 < ?1",
                    params![now_ms],
                )
                .map_err(to_query_err)?;
            Ok(deleted as u64)
        })
        .await
    }

    async fn list_code_files(&self) -> EngramResult<Vec<CodeFileRecord>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT path, language, project_id FROM code_files ORDER BY path")
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CodeFileRecord {
                        path: row.get(0)?,
                        language: row.get(1)?,
                        project_id: row.get(2)?,
                    })
                })
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }

    async fn list_functions(&self) -> EngramResult<Vec<FunctionRecord>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, file_path, class_id, signature FROM functions ORDER BY id",
                )
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(FunctionRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        file_path: row.get(2)?,
                        class_id: row.get(3)?,
                        signature: row.get(4)?,
                    })
                })
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }
}

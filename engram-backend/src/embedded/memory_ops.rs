//! Memory CRUD and usage/validation recording on the embedded store.

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, types::Value, Connection};

use engram_core::errors::EngramResult;
use engram_core::memory::{
    MemoryDraft, MemoryPatch, MemoryRecord, MemoryStats, ScopeKind, UsageRecord,
    ValidationRecord,
};
use engram_core::traits::MemoryOps;

use super::rows::{memory_columns, row_to_memory, scope_kind_str};
use super::{to_query_err, EmbeddedBackend};

fn collect_memories(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> EngramResult<Vec<MemoryRecord>> {
    let mut stmt = conn.prepare(sql).map_err(to_query_err)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| Ok(row_to_memory(row)))
        .map_err(to_query_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_query_err)?;
    rows.into_iter().collect()
}

fn memory_exists(conn: &Connection, id: &str) -> EngramResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(1) FROM memories WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .map_err(to_query_err)?;
    Ok(count > 0)
}

fn merge_agent_instance(conn: &Connection, instance_id: &str, now_ms: i64) -> EngramResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO agent_instances (id, created_at) VALUES (?1, ?2)",
        params![instance_id, now_ms],
    )
    .map_err(to_query_err)?;
    Ok(())
}

/// Recompute `success_rate` from the full usage history.
fn refresh_success_rate(conn: &Connection, memory_id: &str) -> EngramResult<()> {
    conn.execute(
        "UPDATE memories SET success_rate = (
             SELECT CAST(SUM(CASE WHEN outcome = 'successful' THEN 1 ELSE 0 END) AS REAL)
                    / COUNT(1)
             FROM memory_usage WHERE memory_id = ?1
         )
         WHERE id = ?1",
        params![memory_id],
    )
    .map_err(to_query_err)?;
    Ok(())
}

#[async_trait]
impl MemoryOps for EmbeddedBackend {
    async fn create_memory(&self, draft: &MemoryDraft) -> EngramResult<()> {
        let draft = draft.clone();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;

            // A project scope edge needs its project node.
            if draft.scope.kind == ScopeKind::Project {
                tx.execute(
                    "INSERT OR IGNORE INTO projects (id, path, created_at) VALUES (?1, NULL, ?2)",
                    params![draft.scope.id, draft.created_at],
                )
                .map_err(to_query_err)?;
            }

            let tags_json = serde_json::to_string(&draft.tags)?;
            tx.execute(
                "INSERT INTO memories (
                    id, content, agent_type, category, memory_type,
                    quality_score, confidence, importance, tags, metadata,
                    created_at, last_validated, agent_instance_id,
                    scope_kind, scope_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?12, ?13, ?14)",
                params![
                    draft.id,
                    draft.content,
                    draft.agent_type,
                    draft.category,
                    draft.memory_type.as_str(),
                    draft.quality_score,
                    draft.confidence,
                    draft.importance.map(i64::from),
                    tags_json,
                    draft.metadata,
                    draft.created_at,
                    draft.agent_instance_id,
                    scope_kind_str(draft.scope.kind),
                    draft.scope.id,
                ],
            )
            .map_err(to_query_err)?;

            tx.commit().map_err(to_query_err)?;
            Ok(())
        })
        .await
    }

    async fn get_memory(&self, id: &str) -> EngramResult<Option<MemoryRecord>> {
        let id = id.to_string();
        self.read(move |conn| {
            let sql = format!(
                "SELECT {} FROM memories m WHERE m.id = ?1",
                memory_columns("m")
            );
            let mut stmt = conn.prepare(&sql).map_err(to_query_err)?;
            let mut rows = stmt
                .query_map(params![id], |row| Ok(row_to_memory(row)))
                .map_err(to_query_err)?;
            match rows.next() {
                Some(Ok(record)) => Ok(Some(record?)),
                Some(Err(e)) => Err(to_query_err(e)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn update_memory(
        &self,
        id: &str,
        patch: &MemoryPatch,
        now_ms: i64,
    ) -> EngramResult<bool> {
        if patch.is_empty() {
            return Ok(true);
        }
        let id = id.to_string();
        let patch = patch.clone();
        self.write(move |conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut params: Vec<Value> = Vec::new();

            if let Some(content) = &patch.content {
                sets.push("content = ?".to_string());
                params.push(Value::Text(content.clone()));
            }
            if let Some(quality) = patch.quality_score {
                sets.push("quality_score = ?".to_string());
                params.push(Value::Real(quality));
            }
            if let Some(importance) = patch.importance {
                sets.push("importance = ?".to_string());
                params.push(Value::Integer(i64::from(importance)));
            }
            if let Some(metadata) = &patch.metadata {
                sets.push("metadata = ?".to_string());
                params.push(Value::Text(metadata.clone()));
            }
            if let Some(tags) = &patch.tags {
                sets.push("tags = ?".to_string());
                params.push(Value::Text(serde_json::to_string(tags)?));
            }
            sets.push("last_validated = ?".to_string());
            params.push(Value::Integer(now_ms));
            params.push(Value::Text(id.clone()));

            let sql = format!("UPDATE memories SET {} WHERE id = ?", sets.join(", "));
            let changed = conn
                .execute(&sql, params_from_iter(params))
                .map_err(to_query_err)?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_memory(&self, id: &str) -> EngramResult<u64> {
        let id = id.to_string();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            for table in [
                "memory_relations WHERE source_id = ?1 OR target_id = ?1",
                "memory_usage WHERE memory_id = ?1",
                "memory_validations WHERE memory_id = ?1",
                "memory_promotions WHERE memory_id = ?1",
                "memory_sources WHERE memory_id = ?1",
                "memory_code_links WHERE memory_id = ?1",
            ] {
                tx.execute(&format!("DELETE FROM {table}"), params![id])
                    .map_err(to_query_err)?;
            }
            let deleted = tx
                .execute("DELETE FROM memories WHERE id = ?1", params![id])
                .map_err(to_query_err)?;
            tx.commit().map_err(to_query_err)?;
            Ok(deleted as u64)
        })
        .await
    }

    async fn memories_by_agent_type(
        &self,
        agent_type: &str,
        project_id: Option<&str>,
        category: Option<&str>,
        min_quality: f64,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        let agent_type = agent_type.to_string();
        let project_id = project_id.map(str::to_string);
        let category = category.map(str::to_string);
        self.read(move |conn| {
            let mut sql = format!(
                "SELECT {} FROM memories m
                 WHERE m.agent_type = ? AND m.quality_score >= ? AND m.archived = 0",
                memory_columns("m")
            );
            let mut params: Vec<Value> = vec![
                Value::Text(agent_type.clone()),
                Value::Real(min_quality),
            ];

            if let Some(project) = &project_id {
                sql.push_str(
                    " AND ((m.scope_kind = 'project' AND m.scope_id = ?) \
                       OR m.scope_kind = 'agent_type')",
                );
                params.push(Value::Text(project.clone()));
            }
            if let Some(category) = &category {
                sql.push_str(" AND m.category = ?");
                params.push(Value::Text(category.clone()));
            }

            sql.push_str(" ORDER BY m.quality_score DESC, m.created_at DESC LIMIT ?");
            params.push(Value::Integer(limit as i64));

            collect_memories(conn, &sql, params)
        })
        .await
    }

    async fn search_memories(
        &self,
        query: &str,
        agent_type: Option<&str>,
        project_id: Option<&str>,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        let query = query.to_string();
        let agent_type = agent_type.map(str::to_string);
        let project_id = project_id.map(str::to_string);
        self.read(move |conn| {
            let mut sql = format!(
                "SELECT {} FROM memories m
                 WHERE m.archived = 0
                   AND (instr(m.content, ?1) > 0
                        OR EXISTS (SELECT 1 FROM json_each(m.tags) jt
                                   WHERE instr(jt.value, ?1) > 0))",
                memory_columns("m")
            );
            let mut params: Vec<Value> = vec![Value::Text(query.clone())];

            if let Some(agent_type) = &agent_type {
                sql.push_str(" AND m.agent_type = ?");
                params.push(Value::Text(agent_type.clone()));
            }
            if let Some(project) = &project_id {
                sql.push_str(
                    " AND ((m.scope_kind = 'project' AND m.scope_id = ?) \
                       OR m.scope_kind = 'agent_type')",
                );
                params.push(Value::Text(project.clone()));
            }

            sql.push_str(" ORDER BY m.quality_score DESC LIMIT ?");
            params.push(Value::Integer(limit as i64));

            collect_memories(conn, &sql, params)
        })
        .await
    }

    async fn high_quality_memories(
        &self,
        agent_type: &str,
        min_quality: f64,
        min_validations: u32,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        let agent_type = agent_type.to_string();
        self.read(move |conn| {
            let sql = format!(
                "SELECT {} FROM memories m
                 WHERE m.agent_type = ?1
                   AND m.quality_score >= ?2
                   AND m.validation_count >= ?3
                   AND m.archived = 0
                 ORDER BY m.quality_score DESC, m.validation_count DESC
                 LIMIT ?4",
                memory_columns("m")
            );
            collect_memories(
                conn,
                &sql,
                vec![
                    Value::Text(agent_type.clone()),
                    Value::Real(min_quality),
                    Value::Integer(i64::from(min_validations)),
                    Value::Integer(limit as i64),
                ],
            )
        })
        .await
    }

    async fn record_usage(&self, usage: &UsageRecord) -> EngramResult<bool> {
        let usage = usage.clone();
        self.write(move |conn| {
            if !memory_exists(conn, &usage.memory_id)? {
                return Ok(false);
            }
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;

            merge_agent_instance(&tx, &usage.agent_instance_id, usage.used_at)?;
            tx.execute(
                "INSERT INTO memory_usage (memory_id, instance_id, used_at, outcome, feedback_score)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    usage.memory_id,
                    usage.agent_instance_id,
                    usage.used_at,
                    usage.outcome.as_str(),
                    usage.feedback_score,
                ],
            )
            .map_err(to_query_err)?;

            tx.execute(
                "UPDATE memories SET
                     application_count = application_count + 1,
                     access_count = access_count + 1,
                     last_used = ?2,
                     accessed_at = ?2
                 WHERE id = ?1",
                params![usage.memory_id, usage.used_at],
            )
            .map_err(to_query_err)?;

            refresh_success_rate(&tx, &usage.memory_id)?;

            if let Some(feedback) = usage.feedback_score {
                tx.execute(
                    "UPDATE memories SET quality_score = quality_score * 0.9 + ?2 * 0.1
                     WHERE id = ?1",
                    params![usage.memory_id, feedback],
                )
                .map_err(to_query_err)?;
            }

            tx.commit().map_err(to_query_err)?;
            Ok(true)
        })
        .await
    }

    async fn record_validation(&self, validation: &ValidationRecord) -> EngramResult<bool> {
        let validation = validation.clone();
        self.write(move |conn| {
            if !memory_exists(conn, &validation.memory_id)? {
                return Ok(false);
            }
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;

            merge_agent_instance(&tx, &validation.agent_instance_id, validation.validated_at)?;
            tx.execute(
                "INSERT INTO memory_validations
                     (memory_id, instance_id, validated_at, outcome, feedback_score, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    validation.memory_id,
                    validation.agent_instance_id,
                    validation.validated_at,
                    validation.outcome.as_str(),
                    validation.feedback_score,
                    validation.notes,
                ],
            )
            .map_err(to_query_err)?;

            // Quality is the confidence/validation blend, recomputed from
            // the full validation history.
            tx.execute(
                "UPDATE memories SET
                     validation_count = validation_count + 1,
                     last_validated = ?2,
                     quality_score = confidence * 0.3 + (
                         SELECT AVG(feedback_score) FROM memory_validations
                         WHERE memory_id = ?1
                     ) * 0.7
                 WHERE id = ?1",
                params![validation.memory_id, validation.validated_at],
            )
            .map_err(to_query_err)?;

            tx.commit().map_err(to_query_err)?;
            Ok(true)
        })
        .await
    }

    async fn relate_memories(&self, first: &str, second: &str) -> EngramResult<bool> {
        // Store the undirected relation under a canonical ordering.
        let (a, b) = if first <= second {
            (first.to_string(), second.to_string())
        } else {
            (second.to_string(), first.to_string())
        };
        self.write(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO memory_relations (source_id, target_id) VALUES (?1, ?2)",
                    params![a, b],
                )
                .map_err(to_query_err)?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn agent_type_exists(&self, id: &str) -> EngramResult<bool> {
        let id = id.to_string();
        self.read(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(1) FROM agent_types WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(to_query_err)?;
            Ok(count > 0)
        })
        .await
    }

    async fn memory_stats(&self, agent_type: Option<&str>) -> EngramResult<MemoryStats> {
        let agent_type = agent_type.map(str::to_string);
        self.read(move |conn| {
            let (sql, params): (&str, Vec<Value>) = match &agent_type {
                Some(at) => (
                    "SELECT COUNT(1),
                            COALESCE(AVG(quality_score), 0),
                            COALESCE(SUM(application_count), 0),
                            COALESCE(AVG(success_rate), 0)
                     FROM memories WHERE agent_type = ?",
                    vec![Value::Text(at.clone())],
                ),
                None => (
                    "SELECT COUNT(1),
                            COALESCE(AVG(quality_score), 0),
                            COALESCE(SUM(application_count), 0),
                            COALESCE(AVG(success_rate), 0)
                     FROM memories",
                    Vec::new(),
                ),
            };
            conn.query_row(sql, params_from_iter(params), |row| {
                Ok(MemoryStats {
                    total_memories: row.get::<_, i64>(0)? as u64,
                    avg_quality: row.get(1)?,
                    total_applications: row.get::<_, i64>(2)? as u64,
                    avg_success_rate: row.get(3)?,
                })
            })
            .map_err(to_query_err)
        })
        .await
    }
}

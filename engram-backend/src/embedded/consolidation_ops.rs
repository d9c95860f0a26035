//! Consolidation sweeps: quality inputs, promotion, decay, merging.

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, types::Value};

use engram_core::constants::GLOBAL_PROJECT_ID;
use engram_core::errors::EngramResult;
use engram_core::memory::MemoryType;
use engram_core::models::{MemoryDigest, QualityInputs, QualityUpdate};
use engram_core::traits::ConsolidationOps;

use super::rows::parse_tags;
use super::{to_query_err, EmbeddedBackend};

#[async_trait]
impl ConsolidationOps for EmbeddedBackend {
    async fn quality_inputs(&self, project_id: Option<&str>) -> EngramResult<Vec<QualityInputs>> {
        let project_id = project_id.map(str::to_string);
        self.read(move |conn| {
            let mut sql = "SELECT m.id, m.access_count, m.created_at, m.importance,
                        json_array_length(m.tags),
                        (SELECT COUNT(1) FROM memory_relations r
                         WHERE r.source_id = m.id OR r.target_id = m.id)
                 FROM memories m WHERE m.archived = 0"
                .to_string();
            let mut params: Vec<Value> = Vec::new();
            if let Some(project) = &project_id {
                sql.push_str(" AND m.scope_kind = 'project' AND m.scope_id = ?");
                params.push(Value::Text(project.clone()));
            }
            sql.push_str(" ORDER BY m.created_at DESC");

            let mut stmt = conn.prepare(&sql).map_err(to_query_err)?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok(QualityInputs {
                        memory_id: row.get(0)?,
                        access_count: row.get::<_, i64>(1)? as u32,
                        created_at: row.get(2)?,
                        importance: row.get::<_, Option<i64>>(3)?.map(|v| v as u8),
                        tag_count: row.get::<_, i64>(4)? as u32,
                        related_count: row.get::<_, i64>(5)? as u32,
                    })
                })
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }

    async fn write_quality_scores(
        &self,
        updates: &[QualityUpdate],
        now_ms: i64,
    ) -> EngramResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let updates = updates.to_vec();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            let mut updated = 0u64;
            for update in &updates {
                updated += tx
                    .execute(
                        "UPDATE memories SET quality_score = ?2, last_quality_update = ?3
                         WHERE id = ?1",
                        params![update.memory_id, update.quality_score, now_ms],
                    )
                    .map_err(to_query_err)? as u64;
            }
            tx.commit().map_err(to_query_err)?;
            Ok(updated)
        })
        .await
    }

    async fn promotion_candidates(
        &self,
        project_id: &str,
        min_score: f64,
    ) -> EngramResult<Vec<String>> {
        let project_id = project_id.to_string();
        self.read(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT m.id FROM memories m
                     WHERE m.scope_kind = 'project' AND m.scope_id = ?1
                       AND m.quality_score >= ?2
                       AND m.archived = 0
                       AND NOT EXISTS (
                           SELECT 1 FROM memory_promotions mp
                           WHERE mp.memory_id = m.id AND mp.project_id = ?3
                       )
                     ORDER BY m.created_at ASC, m.id ASC",
                )
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map(
                    params![project_id, min_score, GLOBAL_PROJECT_ID],
                    |row| row.get::<_, String>(0),
                )
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }

    async fn promote_memories(
        &self,
        ids: &[String],
        from_project: &str,
        now_ms: i64,
    ) -> EngramResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        let from_project = from_project.to_string();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            tx.execute(
                "INSERT OR IGNORE INTO projects (id, path, created_at) VALUES (?1, NULL, ?2)",
                params![GLOBAL_PROJECT_ID, now_ms],
            )
            .map_err(to_query_err)?;

            let mut promoted = 0u64;
            for id in &ids {
                let inserted = tx
                    .execute(
                        "INSERT OR IGNORE INTO memory_promotions (memory_id, project_id, promoted_at)
                         VALUES (?1, ?2, ?3)",
                        params![id, GLOBAL_PROJECT_ID, now_ms],
                    )
                    .map_err(to_query_err)?;
                if inserted > 0 {
                    tx.execute(
                        "UPDATE memories SET promoted_at = ?2, promoted_from = ?3 WHERE id = ?1",
                        params![id, now_ms, from_project],
                    )
                    .map_err(to_query_err)?;
                    promoted += 1;
                }
            }
            tx.commit().map_err(to_query_err)?;
            Ok(promoted)
        })
        .await
    }

    async fn decay_candidates(
        &self,
        cutoff_ms: i64,
        max_access: u32,
        max_quality: f64,
    ) -> EngramResult<Vec<String>> {
        self.read(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id FROM memories
                     WHERE created_at < ?1
                       AND access_count < ?2
                       AND quality_score < ?3
                       AND archived = 0
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map(
                    params![cutoff_ms, i64::from(max_access), max_quality],
                    |row| row.get::<_, String>(0),
                )
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }

    async fn decay_memories(&self, ids: &[String], now_ms: i64) -> EngramResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            let mut decayed = 0u64;
            for id in &ids {
                decayed += tx
                    .execute(
                        "UPDATE memories SET
                             importance = CASE
                                 WHEN COALESCE(importance, 5) > 1
                                     THEN COALESCE(importance, 5) - 1
                                 ELSE 1
                             END,
                             archived = 1,
                             decayed_at = ?2
                         WHERE id = ?1 AND archived = 0",
                        params![id, now_ms],
                    )
                    .map_err(to_query_err)? as u64;
            }
            tx.commit().map_err(to_query_err)?;
            Ok(decayed)
        })
        .await
    }

    async fn memory_digests(&self, project_id: &str) -> EngramResult<Vec<MemoryDigest>> {
        let project_id = project_id.to_string();
        self.read(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, memory_type, created_at, tags FROM memories
                     WHERE scope_kind = 'project' AND scope_id = ?1 AND archived = 0",
                )
                .map_err(to_query_err)?;
            let rows = stmt
                .query_map(params![project_id], |row| {
                    let memory_type_raw: String = row.get(1)?;
                    let tags_raw: String = row.get(3)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        memory_type_raw,
                        row.get::<_, i64>(2)?,
                        tags_raw,
                    ))
                })
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;

            rows.into_iter()
                .map(|(id, type_raw, created_at, tags_raw)| {
                    Ok(MemoryDigest {
                        id,
                        memory_type: MemoryType::parse(&type_raw)?,
                        created_at,
                        tags: parse_tags(&tags_raw),
                    })
                })
                .collect()
        })
        .await
    }

    async fn apply_merge(
        &self,
        keep_id: &str,
        merge_id: &str,
        merged_tags: &[String],
        merged_metadata: &str,
        now_ms: i64,
    ) -> EngramResult<bool> {
        let keep_id = keep_id.to_string();
        let merge_id = merge_id.to_string();
        let tags_json = serde_json::to_string(&merged_tags.to_vec())?;
        let merged_metadata = merged_metadata.to_string();
        self.write(move |conn| {
            // Already merged: keep the audit trail, change nothing.
            let already: i64 = conn
                .query_row(
                    "SELECT COUNT(1) FROM memories WHERE id = ?1 AND merged_into IS NOT NULL",
                    params![merge_id],
                    |row| row.get(0),
                )
                .map_err(to_query_err)?;
            if already > 0 {
                return Ok(false);
            }

            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            let changed = tx
                .execute(
                    "UPDATE memories SET tags = ?2, metadata = ?3 WHERE id = ?1",
                    params![keep_id, tags_json, merged_metadata],
                )
                .map_err(to_query_err)?;
            if changed == 0 {
                return Ok(false);
            }

            // Transfer relations from the merged memory, skipping ones the
            // kept memory already has.
            let neighbors: Vec<String> = {
                let mut stmt = tx
                    .prepare(
                        "SELECT CASE WHEN source_id = ?1 THEN target_id ELSE source_id END
                         FROM memory_relations
                         WHERE source_id = ?1 OR target_id = ?1",
                    )
                    .map_err(to_query_err)?;
                let rows = stmt
                    .query_map(params![merge_id], |row| row.get::<_, String>(0))
                    .map_err(to_query_err)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(to_query_err)?;
                rows
            };
            for neighbor in neighbors {
                if neighbor == keep_id {
                    continue;
                }
                let (a, b) = if keep_id <= neighbor {
                    (keep_id.clone(), neighbor)
                } else {
                    (neighbor, keep_id.clone())
                };
                tx.execute(
                    "INSERT OR IGNORE INTO memory_relations (source_id, target_id) VALUES (?1, ?2)",
                    params![a, b],
                )
                .map_err(to_query_err)?;
            }

            tx.execute(
                "UPDATE memories SET merged_into = ?2, merged_at = ?3, archived = 1
                 WHERE id = ?1",
                params![merge_id, keep_id, now_ms],
            )
            .map_err(to_query_err)?;

            tx.commit().map_err(to_query_err)?;
            Ok(true)
        })
        .await
    }
}

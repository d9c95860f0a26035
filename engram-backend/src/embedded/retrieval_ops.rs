//! Raw candidate queries for the retrieval strategies.

use async_trait::async_trait;
use rusqlite::{params_from_iter, types::Value, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{IsolationFilter, MemoryCandidate};
use engram_core::traits::RetrievalOps;

use super::filters::isolation_clause;
use super::rows::{candidate_columns, row_to_candidate};
use super::{to_query_err, EmbeddedBackend};

fn collect_candidates(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> EngramResult<Vec<MemoryCandidate>> {
    let mut stmt = conn.prepare(sql).map_err(to_query_err)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| Ok(row_to_candidate(row)))
        .map_err(to_query_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_query_err)?;
    rows.into_iter().collect()
}

fn collect_ranked(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> EngramResult<Vec<(MemoryCandidate, u32)>> {
    let mut stmt = conn.prepare(sql).map_err(to_query_err)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            let rank: i64 = row.get(7)?;
            Ok(row_to_candidate(row).map(|c| (c, rank as u32)))
        })
        .map_err(to_query_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_query_err)?;
    rows.into_iter().collect()
}

#[async_trait]
impl RetrievalOps for EmbeddedBackend {
    async fn recent_memories(
        &self,
        filter: &IsolationFilter,
        limit: usize,
    ) -> EngramResult<Vec<MemoryCandidate>> {
        let filter = filter.clone();
        self.read(move |conn| {
            let (clause, mut params) = isolation_clause(&filter);
            let sql = format!(
                "SELECT {} FROM memories m WHERE {clause}
                 ORDER BY m.created_at DESC LIMIT ?",
                candidate_columns("m")
            );
            params.push(Value::Integer(limit as i64));
            collect_candidates(conn, &sql, params)
        })
        .await
    }

    async fn tag_overlap_memories(
        &self,
        filter: &IsolationFilter,
        query_tags: &[String],
        limit: usize,
    ) -> EngramResult<Vec<(MemoryCandidate, u32)>> {
        if query_tags.is_empty() {
            return Ok(Vec::new());
        }
        let filter = filter.clone();
        let query_tags = query_tags.to_vec();
        self.read(move |conn| {
            let (clause, mut params) = isolation_clause(&filter);
            let tag_placeholders = vec!["?"; query_tags.len()].join(", ");
            let sql = format!(
                "SELECT * FROM (
                     SELECT {cols},
                            (SELECT COUNT(1) FROM json_each(m.tags) jt
                             WHERE jt.value IN ({tag_placeholders})) AS match_count
                     FROM memories m WHERE {clause}
                 )
                 WHERE match_count > 0
                 ORDER BY match_count DESC, importance DESC
                 LIMIT ?",
                cols = candidate_columns("m"),
            );
            // The tag subquery binds before the isolation clause params.
            let mut bound: Vec<Value> = query_tags
                .iter()
                .map(|t| Value::Text(t.clone()))
                .collect();
            bound.append(&mut params);
            bound.push(Value::Integer(limit as i64));
            collect_ranked(conn, &sql, bound)
        })
        .await
    }

    async fn related_memories(
        &self,
        filter: &IsolationFilter,
        start_id: &str,
        max_depth: u32,
        limit: usize,
    ) -> EngramResult<Vec<(MemoryCandidate, u32)>> {
        let filter = filter.clone();
        let start_id = start_id.to_string();
        let depth = max_depth.clamp(1, 2);
        self.read(move |conn| {
            let (clause, iso_params) = isolation_clause(&filter);
            let second_hop = if depth >= 2 {
                "UNION ALL
                 SELECT CASE WHEN r.source_id = d1.id THEN r.target_id ELSE r.source_id END, 2
                 FROM memory_relations r
                 JOIN d1 ON r.source_id = d1.id OR r.target_id = d1.id"
            } else {
                ""
            };
            let sql = format!(
                "WITH d1 AS (
                     SELECT CASE WHEN r.source_id = ? THEN r.target_id ELSE r.source_id END AS id
                     FROM memory_relations r
                     WHERE r.source_id = ? OR r.target_id = ?
                 ),
                 dist (id, distance) AS (
                     SELECT id, 1 FROM d1
                     {second_hop}
                 ),
                 best AS (
                     SELECT id, MIN(distance) AS distance FROM dist
                     WHERE id <> ? GROUP BY id
                 )
                 SELECT {cols}, best.distance
                 FROM memories m JOIN best ON m.id = best.id
                 WHERE {clause}
                 ORDER BY best.distance ASC, m.importance DESC
                 LIMIT ?",
                cols = candidate_columns("m"),
            );
            let mut bound: Vec<Value> = vec![
                Value::Text(start_id.clone()),
                Value::Text(start_id.clone()),
                Value::Text(start_id.clone()),
                Value::Text(start_id.clone()),
            ];
            bound.extend(iso_params.iter().cloned());
            bound.push(Value::Integer(limit as i64));
            collect_ranked(conn, &sql, bound)
        })
        .await
    }
}

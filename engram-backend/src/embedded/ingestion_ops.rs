//! Codebase identity and ingestion-history tracking.

use async_trait::async_trait;
use rusqlite::{params, Row};

use engram_core::errors::EngramResult;
use engram_core::models::{CodebaseIdentity, CodebaseRecord, IngestionRecord};
use engram_core::traits::IngestionOps;

use super::{to_query_err, EmbeddedBackend};

fn row_to_ingestion(row: &Row<'_>) -> Result<IngestionRecord, rusqlite::Error> {
    Ok(IngestionRecord {
        ingestion_id: row.get(0)?,
        ingestion_counter: row.get::<_, i64>(1)? as u32,
        commit_sha: row.get(2)?,
        timestamp: row.get(3)?,
        metadata: Default::default(),
    })
}

const INGESTION_COLUMNS: &str = "ingestion_id, ingestion_counter, commit_sha, timestamp";

#[async_trait]
impl IngestionOps for EmbeddedBackend {
    async fn find_codebase(&self, unique_key: &str) -> EngramResult<Option<CodebaseRecord>> {
        let unique_key = unique_key.to_string();
        self.read(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT unique_key, remote_url, branch, commit_sha,
                            ingestion_count, created_at, updated_at
                     FROM codebases WHERE unique_key = ?1",
                )
                .map_err(to_query_err)?;
            let mut rows = stmt
                .query_map(params![unique_key], |row| {
                    Ok(CodebaseRecord {
                        unique_key: row.get(0)?,
                        remote_url: row.get(1)?,
                        branch: row.get(2)?,
                        commit_sha: row.get(3)?,
                        ingestion_count: row.get::<_, i64>(4)? as u32,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                })
                .map_err(to_query_err)?;
            match rows.next() {
                Some(record) => Ok(Some(record.map_err(to_query_err)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn latest_ingestion(
        &self,
        unique_key: &str,
    ) -> EngramResult<Option<IngestionRecord>> {
        let unique_key = unique_key.to_string();
        self.read(move |conn| {
            let sql = format!(
                "SELECT {INGESTION_COLUMNS} FROM ingestions
                 WHERE codebase_key = ?1
                 ORDER BY ingestion_counter DESC LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql).map_err(to_query_err)?;
            let mut rows = stmt
                .query_map(params![unique_key], row_to_ingestion)
                .map_err(to_query_err)?;
            match rows.next() {
                Some(record) => Ok(Some(record.map_err(to_query_err)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn create_codebase(
        &self,
        identity: &CodebaseIdentity,
        ingestion: &IngestionRecord,
        now_ms: i64,
    ) -> EngramResult<()> {
        let identity = identity.clone();
        let ingestion = ingestion.clone();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            tx.execute(
                "INSERT INTO codebases
                     (unique_key, remote_url, branch, commit_sha, ingestion_count,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                params![
                    identity.unique_key,
                    identity.remote_url,
                    identity.branch,
                    identity.commit_sha,
                    now_ms,
                ],
            )
            .map_err(to_query_err)?;
            tx.execute(
                "INSERT INTO ingestions
                     (ingestion_id, codebase_key, ingestion_counter, commit_sha, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    ingestion.ingestion_id,
                    identity.unique_key,
                    i64::from(ingestion.ingestion_counter),
                    ingestion.commit_sha,
                    ingestion.timestamp,
                ],
            )
            .map_err(to_query_err)?;
            tx.commit().map_err(to_query_err)?;
            Ok(())
        })
        .await
    }

    async fn append_ingestion(
        &self,
        identity: &CodebaseIdentity,
        ingestion: &IngestionRecord,
        previous_id: &str,
        now_ms: i64,
    ) -> EngramResult<()> {
        let identity = identity.clone();
        let ingestion = ingestion.clone();
        let previous_id = previous_id.to_string();
        self.write(move |conn| {
            let tx = conn.unchecked_transaction().map_err(to_query_err)?;
            tx.execute(
                "UPDATE codebases SET
                     commit_sha = ?2,
                     updated_at = ?3,
                     ingestion_count = ingestion_count + 1
                 WHERE unique_key = ?1",
                params![identity.unique_key, identity.commit_sha, now_ms],
            )
            .map_err(to_query_err)?;
            tx.execute(
                "INSERT INTO ingestions
                     (ingestion_id, codebase_key, ingestion_counter, commit_sha, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    ingestion.ingestion_id,
                    identity.unique_key,
                    i64::from(ingestion.ingestion_counter),
                    ingestion.commit_sha,
                    ingestion.timestamp,
                ],
            )
            .map_err(to_query_err)?;
            tx.execute(
                "UPDATE ingestions SET superseded_by = ?2 WHERE ingestion_id = ?1",
                params![previous_id, ingestion.ingestion_id],
            )
            .map_err(to_query_err)?;
            tx.commit().map_err(to_query_err)?;
            Ok(())
        })
        .await
    }

    async fn ingestion_history(&self, unique_key: &str) -> EngramResult<Vec<IngestionRecord>> {
        let unique_key = unique_key.to_string();
        self.read(move |conn| {
            let sql = format!(
                "SELECT {INGESTION_COLUMNS} FROM ingestions
                 WHERE codebase_key = ?1
                 ORDER BY ingestion_counter ASC"
            );
            let mut stmt = conn.prepare(&sql).map_err(to_query_err)?;
            let rows = stmt
                .query_map(params![unique_key], row_to_ingestion)
                .map_err(to_query_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(to_query_err)?;
            Ok(rows)
        })
        .await
    }
}

//! Codebase identity and ingestion tracking as parameterized Cypher.

use async_trait::async_trait;
use neo4rs::{Query, Row};

use engram_core::errors::EngramResult;
use engram_core::models::{CodebaseIdentity, CodebaseRecord, IngestionRecord};
use engram_core::traits::IngestionOps;

use super::rows::req;
use super::RemoteBackend;

const INGESTION_RETURN: &str = "i.ingestion_id as ingestion_id, \
     i.ingestion_counter as ingestion_counter, i.commit_sha as commit_sha, \
     i.timestamp as timestamp";

fn row_to_ingestion(row: &Row) -> EngramResult<IngestionRecord> {
    Ok(IngestionRecord {
        ingestion_id: req(row, "ingestion_id")?,
        ingestion_counter: req::<i64>(row, "ingestion_counter")? as u32,
        commit_sha: req(row, "commit_sha")?,
        timestamp: req(row, "timestamp")?,
        metadata: Default::default(),
    })
}

#[async_trait]
impl IngestionOps for RemoteBackend {
    async fn find_codebase(&self, unique_key: &str) -> EngramResult<Option<CodebaseRecord>> {
        let rows = self
            .run_read(
                Query::new(
                    "MATCH (c:Codebase {unique_key: $unique_key})
                     RETURN c.unique_key as unique_key,
                            c.remote_url as remote_url,
                            c.branch as branch,
                            c.commit_sha as commit_sha,
                            c.ingestion_count as ingestion_count,
                            c.created_at as created_at,
                            c.updated_at as updated_at"
                        .to_string(),
                )
                .param("unique_key", unique_key),
            )
            .await?;
        rows.first()
            .map(|row| {
                Ok(CodebaseRecord {
                    unique_key: req(row, "unique_key")?,
                    remote_url: req(row, "remote_url")?,
                    branch: req(row, "branch")?,
                    commit_sha: req(row, "commit_sha")?,
                    ingestion_count: req::<i64>(row, "ingestion_count")? as u32,
                    created_at: req(row, "created_at")?,
                    updated_at: req(row, "updated_at")?,
                })
            })
            .transpose()
    }

    async fn latest_ingestion(
        &self,
        unique_key: &str,
    ) -> EngramResult<Option<IngestionRecord>> {
        let cypher = format!(
            "MATCH (i:Ingestion)-[:INGESTION_OF]->(c:Codebase {{unique_key: $unique_key}})
             RETURN {INGESTION_RETURN}
             ORDER BY i.ingestion_counter DESC
             LIMIT 1"
        );
        let rows = self
            .run_read(Query::new(cypher).param("unique_key", unique_key))
            .await?;
        rows.first().map(row_to_ingestion).transpose()
    }

    async fn create_codebase(
        &self,
        identity: &CodebaseIdentity,
        ingestion: &IngestionRecord,
        now_ms: i64,
    ) -> EngramResult<()> {
        let query = Query::new(
            "CREATE (c:Codebase {
                 unique_key: $unique_key,
                 remote_url: $remote_url,
                 branch: $branch,
                 commit_sha: $commit_sha,
                 ingestion_count: 1,
                 created_at: $now,
                 updated_at: $now
             })
             CREATE (i:Ingestion {
                 ingestion_id: $ingestion_id,
                 ingestion_counter: $counter,
                 commit_sha: $commit_sha,
                 timestamp: $timestamp
             })
             CREATE (i)-[:INGESTION_OF]->(c)
             RETURN c.unique_key as unique_key"
                .to_string(),
        )
        .param("unique_key", identity.unique_key.as_str())
        .param("remote_url", identity.remote_url.as_str())
        .param("branch", identity.branch.as_str())
        .param("commit_sha", identity.commit_sha.as_str())
        .param("ingestion_id", ingestion.ingestion_id.as_str())
        .param("counter", i64::from(ingestion.ingestion_counter))
        .param("timestamp", ingestion.timestamp)
        .param("now", now_ms);

        self.run_write(query).await.map(|_| ())
    }

    async fn append_ingestion(
        &self,
        identity: &CodebaseIdentity,
        ingestion: &IngestionRecord,
        previous_id: &str,
        now_ms: i64,
    ) -> EngramResult<()> {
        let query = Query::new(
            "MATCH (c:Codebase {unique_key: $unique_key})
             MATCH (prev:Ingestion {ingestion_id: $previous_id})
             SET c.commit_sha = $commit_sha,
                 c.updated_at = $now,
                 c.ingestion_count = c.ingestion_count + 1
             CREATE (i:Ingestion {
                 ingestion_id: $ingestion_id,
                 ingestion_counter: $counter,
                 commit_sha: $commit_sha,
                 timestamp: $timestamp
             })
             CREATE (i)-[:INGESTION_OF]->(c)
             CREATE (prev)-[:SUPERSEDED_BY]->(i)
             RETURN i.ingestion_id as ingestion_id"
                .to_string(),
        )
        .param("unique_key", identity.unique_key.as_str())
        .param("previous_id", previous_id)
        .param("commit_sha", identity.commit_sha.as_str())
        .param("ingestion_id", ingestion.ingestion_id.as_str())
        .param("counter", i64::from(ingestion.ingestion_counter))
        .param("timestamp", ingestion.timestamp)
        .param("now", now_ms);

        self.run_write(query).await.map(|_| ())
    }

    async fn ingestion_history(&self, unique_key: &str) -> EngramResult<Vec<IngestionRecord>> {
        let cypher = format!(
            "MATCH (i:Ingestion)-[:INGESTION_OF]->(c:Codebase {{unique_key: $unique_key}})
             RETURN {INGESTION_RETURN}
             ORDER BY i.ingestion_counter ASC"
        );
        let rows = self
            .run_read(Query::new(cypher).param("unique_key", unique_key))
            .await?;
        rows.iter().map(row_to_ingestion).collect()
    }
}

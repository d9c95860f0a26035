//! The consolidation engine: sweeps over the memory store, serialized
//! per project.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use engram_core::constants::{
    DECAY_THRESHOLD_DAYS, DUPLICATE_SIMILARITY_THRESHOLD, DUPLICATE_WINDOW_MS,
    PROMOTION_THRESHOLD,
};
use engram_core::errors::{EngramResult, StoreError};
use engram_core::models::{DuplicatePair, QualityUpdate};
use engram_core::time::{now_ms, DAY_MS};
use engram_core::traits::{ConsolidationOps, GraphBackend, MemoryOps};

use crate::quality::QualityMetrics;
use crate::similarity::jaccard_similarity;

/// Decay sweep: skip memories accessed at least this often.
const DECAY_MAX_ACCESS: u32 = 5;

/// Decay sweep: skip memories at or above this quality.
const DECAY_MAX_QUALITY: f64 = 0.5;

/// Duplicate report ceiling; pairs are sorted strongest-first before the
/// cut.
const DUPLICATE_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ConsolidatorConfig {
    pub promotion_threshold: f64,
    pub decay_threshold_days: i64,
    pub duplicate_similarity_threshold: f64,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: PROMOTION_THRESHOLD,
            decay_threshold_days: DECAY_THRESHOLD_DAYS,
            duplicate_similarity_threshold: DUPLICATE_SIMILARITY_THRESHOLD,
        }
    }
}

/// Counts from one full consolidation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationSummary {
    pub quality_scores_updated: u64,
    pub memories_promoted: u64,
    pub memories_decayed: u64,
    pub duplicate_pairs_found: u64,
}

/// Manages memory consolidation and quality.
pub struct Consolidator {
    backend: Arc<dyn GraphBackend>,
    config: ConsolidatorConfig,
    /// Projects with a sweep in flight; sweeps never run concurrently for
    /// the same project.
    active_sweeps: Mutex<HashSet<String>>,
}

impl Consolidator {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self::with_config(backend, ConsolidatorConfig::default())
    }

    pub fn with_config(backend: Arc<dyn GraphBackend>, config: ConsolidatorConfig) -> Self {
        Self {
            backend,
            config,
            active_sweeps: Mutex::new(HashSet::new()),
        }
    }

    /// Compute quality metrics for every memory in scope.
    pub async fn calculate_quality_scores(
        &self,
        project_id: Option<&str>,
    ) -> EngramResult<Vec<QualityMetrics>> {
        let now = now_ms();
        let inputs = self.backend.quality_inputs(project_id).await?;
        let metrics: Vec<QualityMetrics> = inputs
            .iter()
            .map(|input| QualityMetrics::from_inputs(input, now))
            .collect();
        tracing::info!(count = metrics.len(), "calculated quality scores");
        Ok(metrics)
    }

    /// Write computed scores back to the graph.
    pub async fn update_quality_scores(
        &self,
        metrics: &[QualityMetrics],
    ) -> EngramResult<u64> {
        if metrics.is_empty() {
            return Ok(0);
        }
        let updates: Vec<QualityUpdate> = metrics
            .iter()
            .map(|m| QualityUpdate {
                memory_id: m.memory_id.clone(),
                quality_score: m.quality_score,
            })
            .collect();
        let updated = self
            .backend
            .write_quality_scores(&updates, now_ms())
            .await?;
        tracing::info!(updated, "updated quality scores");
        Ok(updated)
    }

    /// Promote every eligible project memory to the global project.
    /// Returns the promoted ids; already-promoted memories are skipped, so
    /// re-running promotes nothing new.
    pub async fn promote_to_global(
        &self,
        project_id: &str,
        min_score: Option<f64>,
    ) -> EngramResult<Vec<String>> {
        let min_score = min_score.unwrap_or(self.config.promotion_threshold);
        let candidates = self
            .backend
            .promotion_candidates(project_id, min_score)
            .await?;
        if candidates.is_empty() {
            tracing::info!("no memories eligible for promotion");
            return Ok(Vec::new());
        }
        let promoted = self
            .backend
            .promote_memories(&candidates, project_id, now_ms())
            .await?;
        tracing::info!(promoted, "promoted memories to global scope");
        Ok(candidates)
    }

    /// Archive every old, unused, low-quality memory. With `dry_run` the
    /// candidate ids are returned without mutation.
    pub async fn apply_decay(&self, dry_run: bool) -> EngramResult<Vec<String>> {
        let cutoff = now_ms() - self.config.decay_threshold_days * DAY_MS;
        let candidates = self
            .backend
            .decay_candidates(cutoff, DECAY_MAX_ACCESS, DECAY_MAX_QUALITY)
            .await?;
        if candidates.is_empty() {
            tracing::info!("no memories eligible for decay");
            return Ok(Vec::new());
        }
        if dry_run {
            tracing::info!(count = candidates.len(), "dry run: memories would be decayed");
            return Ok(candidates);
        }
        let decayed = self.backend.decay_memories(&candidates, now_ms()).await?;
        tracing::info!(decayed, "applied decay");
        Ok(candidates)
    }

    /// Detect duplicate pairs within a project: same memory type, created
    /// within an hour of each other, tag similarity at or above the
    /// threshold. Pairs are ordered (`first < second`), strongest first.
    pub async fn detect_duplicates(
        &self,
        project_id: &str,
        similarity_threshold: Option<f64>,
    ) -> EngramResult<Vec<DuplicatePair>> {
        let threshold = similarity_threshold.unwrap_or(self.config.duplicate_similarity_threshold);
        let digests = self.backend.memory_digests(project_id).await?;

        let mut pairs = Vec::new();
        for (i, first) in digests.iter().enumerate() {
            for second in &digests[i + 1..] {
                if first.memory_type != second.memory_type {
                    continue;
                }
                if (first.created_at - second.created_at).abs() >= DUPLICATE_WINDOW_MS {
                    continue;
                }
                let similarity = jaccard_similarity(&first.tags, &second.tags);
                if similarity >= threshold {
                    let (a, b) = if first.id < second.id {
                        (first.id.clone(), second.id.clone())
                    } else {
                        (second.id.clone(), first.id.clone())
                    };
                    pairs.push(DuplicatePair {
                        first: a,
                        second: b,
                        similarity,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs.truncate(DUPLICATE_LIMIT);
        tracing::info!(count = pairs.len(), "found potential duplicate pairs");
        Ok(pairs)
    }

    /// Merge one memory into another: union tags, merge metadata, transfer
    /// relations, and archive the merged memory with an audit trail. The
    /// merged memory is never deleted; re-merging is a no-op.
    pub async fn merge_duplicates(
        &self,
        memory_id_1: &str,
        memory_id_2: &str,
        keep_first: bool,
    ) -> EngramResult<bool> {
        let (keep_id, merge_id) = if keep_first {
            (memory_id_1, memory_id_2)
        } else {
            (memory_id_2, memory_id_1)
        };

        let keep = self.backend.get_memory(keep_id).await?.ok_or_else(|| {
            StoreError::NotFound {
                id: keep_id.to_string(),
            }
        })?;
        let Some(merge) = self.backend.get_memory(merge_id).await? else {
            return Err(StoreError::NotFound {
                id: merge_id.to_string(),
            }
            .into());
        };
        if merge.merged_into.is_some() {
            tracing::debug!(memory_id = %merge_id, "already merged, skipping");
            return Ok(false);
        }

        let mut merged_tags = keep.tags.clone();
        for tag in &merge.tags {
            if !merged_tags.contains(tag) {
                merged_tags.push(tag.clone());
            }
        }
        let merged_metadata = merge_metadata(&keep.metadata, &merge.metadata)?;

        let merged = self
            .backend
            .apply_merge(keep_id, merge_id, &merged_tags, &merged_metadata, now_ms())
            .await?;
        if merged {
            tracing::info!(merged = %merge_id, into = %keep_id, "merged memory");
        }
        Ok(merged)
    }

    /// Full sweep for one project: score, promote, decay, report
    /// duplicates. Concurrent sweeps for the same project are rejected.
    pub async fn run_consolidation(&self, project_id: &str) -> EngramResult<ConsolidationSummary> {
        let _guard = SweepGuard::acquire(&self.active_sweeps, project_id)?;

        let metrics = self.calculate_quality_scores(Some(project_id)).await?;
        let quality_scores_updated = self.update_quality_scores(&metrics).await?;
        let promoted = self.promote_to_global(project_id, None).await?;
        let decayed = self.apply_decay(false).await?;
        let duplicates = self.detect_duplicates(project_id, None).await?;

        Ok(ConsolidationSummary {
            quality_scores_updated,
            memories_promoted: promoted.len() as u64,
            memories_decayed: decayed.len() as u64,
            duplicate_pairs_found: duplicates.len() as u64,
        })
    }
}

/// RAII guard marking a project sweep as in flight.
struct SweepGuard<'a> {
    sweeps: &'a Mutex<HashSet<String>>,
    project_id: String,
}

impl<'a> SweepGuard<'a> {
    fn acquire(sweeps: &'a Mutex<HashSet<String>>, project_id: &str) -> EngramResult<Self> {
        let mut held = sweeps.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(project_id.to_string()) {
            return Err(StoreError::InvalidArgument {
                message: format!("consolidation already running for project {project_id}"),
            }
            .into());
        }
        Ok(Self {
            sweeps,
            project_id: project_id.to_string(),
        })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.sweeps.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.project_id);
    }
}

/// Merge two opaque metadata JSON strings. Keys from the kept memory win;
/// the merged memory only contributes keys the kept one lacks.
fn merge_metadata(keep: &str, merge: &str) -> EngramResult<String> {
    let mut base: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(merge).unwrap_or_default();
    let overlay: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(keep).unwrap_or_default();
    for (key, value) in overlay {
        base.insert(key, value);
    }
    Ok(serde_json::to_string(&serde_json::Value::Object(base))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_merge_prefers_kept_values() {
        let merged = merge_metadata(
            r#"{"language": "rust", "kept": true}"#,
            r#"{"language": "python", "extra": 1}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value["language"], "rust");
        assert_eq!(value["kept"], true);
        assert_eq!(value["extra"], 1);
    }

    #[test]
    fn metadata_merge_tolerates_invalid_json() {
        let merged = merge_metadata("not json", r#"{"a": 1}"#).unwrap();
        let value: serde_json::Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value["a"], 1);
    }
}

//! Weighted fusion of the three strategies. Sub-queries run
//! concurrently, may fail independently, and contribute nothing when
//! they do.

use std::collections::HashMap;
use std::sync::Arc;

use engram_core::errors::{EngramResult, RetrievalError};
use engram_core::models::MemoryHit;
use engram_core::traits::GraphBackend;

use crate::context::RetrievalContext;
use crate::strategies::{GraphRetrieval, SimilarityRetrieval, TemporalRetrieval};

/// Per-strategy weights; must sum to 1.0 within a small tolerance.
#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub temporal: f64,
    pub similarity: f64,
    pub graph: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            temporal: 0.4,
            similarity: 0.4,
            graph: 0.2,
        }
    }
}

impl HybridWeights {
    pub fn validate(&self) -> EngramResult<()> {
        let total = self.temporal + self.similarity + self.graph;
        if (total - 1.0).abs() >= 0.01 {
            return Err(RetrievalError::WeightSum { total }.into());
        }
        Ok(())
    }
}

pub struct HybridRetrieval {
    temporal: TemporalRetrieval,
    similarity: SimilarityRetrieval,
    graph: GraphRetrieval,
    weights: HybridWeights,
}

impl HybridRetrieval {
    pub fn new(backend: Arc<dyn GraphBackend>, weights: HybridWeights) -> EngramResult<Self> {
        weights.validate()?;
        Ok(Self {
            temporal: TemporalRetrieval::new(Arc::clone(&backend)),
            similarity: SimilarityRetrieval::new(Arc::clone(&backend)),
            graph: GraphRetrieval::new(backend),
            weights,
        })
    }

    pub fn with_defaults(backend: Arc<dyn GraphBackend>) -> Self {
        // Default weights always satisfy the sum invariant.
        Self::new(backend, HybridWeights::default())
            .unwrap_or_else(|_| unreachable!("default weights sum to 1.0"))
    }

    /// Run all applicable strategies concurrently, each fetching twice the
    /// requested limit, then fuse and truncate.
    pub async fn retrieve(
        &self,
        context: &RetrievalContext,
        limit: usize,
        query_tags: Option<&[String]>,
        start_memory_id: Option<&str>,
    ) -> EngramResult<Vec<MemoryHit>> {
        context.validate()?;
        let fetch = limit * 2;

        let temporal_fut = self.temporal.retrieve(context, fetch);
        let similarity_fut = async {
            match query_tags {
                Some(tags) if !tags.is_empty() => {
                    self.similarity.retrieve(context, fetch, tags).await
                }
                _ => Ok(Vec::new()),
            }
        };
        let graph_fut = async {
            match start_memory_id {
                Some(start) if !start.is_empty() => {
                    self.graph.retrieve(context, fetch, start).await
                }
                _ => Ok(Vec::new()),
            }
        };

        let (temporal, similarity, graph) = tokio::join!(temporal_fut, similarity_fut, graph_fut);

        let temporal = temporal.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "temporal retrieval failed");
            Vec::new()
        });
        let similarity = similarity.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "similarity retrieval failed");
            Vec::new()
        });
        let graph = graph.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "graph traversal failed");
            Vec::new()
        });

        Ok(combine(temporal, similarity, graph, self.weights, limit))
    }
}

/// Fuse per-strategy hits into one ranking. A memory's combined score is
/// the weighted sum of its per-strategy scores; absent strategies
/// contribute zero.
pub fn combine(
    temporal: Vec<MemoryHit>,
    similarity: Vec<MemoryHit>,
    graph: Vec<MemoryHit>,
    weights: HybridWeights,
    limit: usize,
) -> Vec<MemoryHit> {
    let mut fused: HashMap<String, MemoryHit> = HashMap::new();

    for (hits, weight) in [
        (temporal, weights.temporal),
        (similarity, weights.similarity),
        (graph, weights.graph),
    ] {
        for mut hit in hits {
            let weighted = hit.score * weight;
            match fused.get_mut(&hit.memory_id) {
                Some(existing) => existing.score += weighted,
                None => {
                    hit.score = weighted;
                    fused.insert(hit.memory_id.clone(), hit);
                }
            }
        }
    }

    let mut results: Vec<MemoryHit> = fused.into_values().collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::MemoryType;

    fn hit(id: &str, score: f64) -> MemoryHit {
        MemoryHit {
            memory_id: id.to_string(),
            content: String::new(),
            memory_type: MemoryType::Procedural,
            created_at: 0,
            importance: None,
            tags: Vec::new(),
            metadata: "{}".to_string(),
            score,
        }
    }

    #[test]
    fn weights_must_sum_to_one() {
        let bad = HybridWeights {
            temporal: 0.5,
            similarity: 0.5,
            graph: 0.5,
        };
        assert!(bad.validate().is_err());
        assert!(HybridWeights::default().validate().is_ok());
    }

    #[test]
    fn combined_score_is_weighted_sum_across_strategies() {
        let results = combine(
            vec![hit("a", 1.0), hit("b", 1.0)],
            vec![hit("a", 1.0)],
            vec![hit("a", 0.5)],
            HybridWeights::default(),
            10,
        );
        assert_eq!(results[0].memory_id, "a");
        assert!((results[0].score - 0.9).abs() < 1e-9);
        assert_eq!(results[1].memory_id, "b");
        assert!((results[1].score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn truncates_to_limit_after_sorting() {
        let temporal = (0..10).map(|i| hit(&format!("m{i}"), 1.0 - i as f64 / 10.0)).collect();
        let results = combine(temporal, Vec::new(), Vec::new(), HybridWeights::default(), 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].memory_id, "m0");
    }

    #[test]
    fn absent_strategy_contributes_zero() {
        let results = combine(
            Vec::new(),
            vec![hit("only-similar", 1.0)],
            Vec::new(),
            HybridWeights::default(),
            10,
        );
        assert!((results[0].score - 0.4).abs() < 1e-9);
    }
}

//! The component quality formula: access frequency 30%, importance 30%,
//! tag richness 20%, connectedness 20%.

use serde::{Deserialize, Serialize};

use engram_core::models::QualityInputs;
use engram_core::time::DAY_MS;

/// Default importance when a memory has none assigned.
const DEFAULT_IMPORTANCE: u8 = 5;

/// Accesses per day at which the access component saturates.
const ACCESS_SATURATION_PER_DAY: f64 = 10.0;

/// Tag and relationship counts at which those components saturate.
const RICHNESS_SATURATION: f64 = 10.0;

/// Quality metrics for one memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub memory_id: String,
    pub access_count: u32,
    pub age_days: f64,
    pub importance: u8,
    pub tag_richness: u32,
    pub relationship_count: u32,
    pub quality_score: f64,
}

impl QualityMetrics {
    /// Evaluate the formula for one memory's inputs at time `now_ms`.
    pub fn from_inputs(inputs: &QualityInputs, now_ms: i64) -> Self {
        let age_days = ((now_ms - inputs.created_at) as f64 / DAY_MS as f64).max(0.0);
        let importance = inputs.importance.unwrap_or(DEFAULT_IMPORTANCE);
        let quality_score = Self::calculate_score(
            inputs.access_count,
            age_days,
            importance,
            inputs.tag_count,
            inputs.related_count,
        );
        Self {
            memory_id: inputs.memory_id.clone(),
            access_count: inputs.access_count,
            age_days,
            importance,
            tag_richness: inputs.tag_count,
            relationship_count: inputs.related_count,
            quality_score,
        }
    }

    /// The weighted combination, rounded to 3 decimals.
    pub fn calculate_score(
        access_count: u32,
        age_days: f64,
        importance: u8,
        tag_richness: u32,
        relationship_count: u32,
    ) -> f64 {
        let access_frequency = f64::from(access_count) / age_days.max(1.0);
        let access_score = (access_frequency / ACCESS_SATURATION_PER_DAY).min(1.0);
        let importance_score = f64::from(importance) / 10.0;
        let tag_score = (f64::from(tag_richness) / RICHNESS_SATURATION).min(1.0);
        let relationship_score = (f64::from(relationship_count) / RICHNESS_SATURATION).min(1.0);

        let score = 0.3 * access_score
            + 0.3 * importance_score
            + 0.2 * tag_score
            + 0.2 * relationship_score;
        (score * 1000.0).round() / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_bounded() {
        assert_eq!(QualityMetrics::calculate_score(0, 0.0, 1, 0, 0), 0.03);
        assert_eq!(
            QualityMetrics::calculate_score(u32::MAX, 1.0, 10, 100, 100),
            1.0
        );
    }

    #[test]
    fn components_weight_as_documented() {
        // 5 accesses/day on a 1-day-old memory: access 0.5 * 0.3 = 0.15;
        // importance 5 → 0.15; 5 tags → 0.1; 5 relations → 0.1.
        let score = QualityMetrics::calculate_score(5, 1.0, 5, 5, 5);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn young_memories_use_one_day_floor() {
        let fresh = QualityMetrics::calculate_score(10, 0.0, 5, 0, 0);
        let one_day = QualityMetrics::calculate_score(10, 1.0, 5, 0, 0);
        assert_eq!(fresh, one_day);
    }

    #[test]
    fn rounds_to_three_decimals() {
        let score = QualityMetrics::calculate_score(1, 3.0, 5, 1, 1);
        assert_eq!(score, (score * 1000.0).round() / 1000.0);
    }
}

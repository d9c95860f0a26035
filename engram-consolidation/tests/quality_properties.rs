use proptest::prelude::*;

use engram_consolidation::{jaccard_similarity, QualityMetrics};

proptest! {
    #[test]
    fn quality_score_stays_in_unit_interval(
        access_count in 0u32..1_000_000,
        age_days in 0.0f64..10_000.0,
        importance in 1u8..=10,
        tag_richness in 0u32..1_000,
        relationship_count in 0u32..1_000,
    ) {
        let score = QualityMetrics::calculate_score(
            access_count,
            age_days,
            importance,
            tag_richness,
            relationship_count,
        );
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn quality_is_monotone_in_importance(
        access_count in 0u32..100,
        age_days in 0.0f64..365.0,
        tag_richness in 0u32..20,
        relationship_count in 0u32..20,
        lower in 1u8..=9,
    ) {
        let low = QualityMetrics::calculate_score(
            access_count, age_days, lower, tag_richness, relationship_count,
        );
        let high = QualityMetrics::calculate_score(
            access_count, age_days, lower + 1, tag_richness, relationship_count,
        );
        prop_assert!(high >= low);
    }

    #[test]
    fn jaccard_is_bounded_and_symmetric(
        first in prop::collection::vec("[a-z]{1,6}", 0..10),
        second in prop::collection::vec("[a-z]{1,6}", 0..10),
    ) {
        let forward = jaccard_similarity(&first, &second);
        let backward = jaccard_similarity(&second, &first);
        prop_assert!((0.0..=1.0).contains(&forward));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn jaccard_of_identical_non_empty_sets_is_one(
        tags in prop::collection::vec("[a-z]{1,6}", 1..10),
    ) {
        prop_assert_eq!(jaccard_similarity(&tags, &tags), 1.0);
    }
}

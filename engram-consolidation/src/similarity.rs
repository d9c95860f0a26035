//! Tag-set similarity for duplicate detection.

use std::collections::HashSet;

/// Jaccard similarity of two tag lists. Returns 0.0 when either set is
/// empty or they share nothing.
pub fn jaccard_similarity(first: &[String], second: &[String]) -> f64 {
    let a: HashSet<&str> = first.iter().map(String::as_str).collect();
    let b: HashSet<&str> = second.iter().map(String::as_str).collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    if intersection == 0 {
        return 0.0;
    }
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_sets_score_one() {
        let t = tags(&["arenas", "memory"]);
        assert_eq!(jaccard_similarity(&t, &t), 1.0);
    }

    #[test]
    fn disjoint_sets_score_zero() {
        assert_eq!(
            jaccard_similarity(&tags(&["a"]), &tags(&["b"])),
            0.0
        );
    }

    #[test]
    fn empty_sets_score_zero() {
        assert_eq!(jaccard_similarity(&[], &tags(&["a"])), 0.0);
        assert_eq!(jaccard_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn partial_overlap() {
        let sim = jaccard_similarity(&tags(&["a", "b", "c"]), &tags(&["b", "c", "d"]));
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn duplicate_entries_do_not_inflate() {
        let sim = jaccard_similarity(&tags(&["a", "a", "b"]), &tags(&["a", "b"]));
        assert_eq!(sim, 1.0);
    }
}

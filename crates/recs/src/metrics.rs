//! Ranking metrics for top-N recommendation lists.
//!
//! All functions take the recommended ids in rank order plus the set
//! of actually interacted ids, and return a value in [0, 1]. Empty
//! actual sets yield 0.0 rather than NaN.

use std::collections::HashSet;

use serde::Serialize;

/// Fraction of the top-N list the user actually interacted with.
pub fn precision_at_n(recommended: &[i64], actual: &HashSet<i64>, n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    let hits = recommended
        .iter()
        .take(n)
        .filter(|id| actual.contains(id))
        .count();
    hits as f32 / n as f32
}

/// Fraction of the user's interactions the top-N list recovered.
pub fn recall_at_n(recommended: &[i64], actual: &HashSet<i64>, n: usize) -> f32 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = recommended
        .iter()
        .take(n)
        .filter(|id| actual.contains(id))
        .count();
    hits as f32 / actual.len() as f32
}

/// Normalized discounted cumulative gain with binary relevance.
///
/// `DCG = Σ 1 / log2(i + 2)` over hit positions `i` (0-based); the
/// ideal DCG places `min(n, |actual|)` hits at the top.
pub fn ndcg_at_n(recommended: &[i64], actual: &HashSet<i64>, n: usize) -> f32 {
    if actual.is_empty() || n == 0 {
        return 0.0;
    }
    let dcg: f32 = recommended
        .iter()
        .take(n)
        .enumerate()
        .filter(|(_, id)| actual.contains(*id))
        .map(|(i, _)| 1.0 / ((i + 2) as f32).log2())
        .sum();
    let idcg: f32 = (0..n.min(actual.len()))
        .map(|i| 1.0 / ((i + 2) as f32).log2())
        .sum();
    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// Average precision of a single ranked list.
///
/// At each hit position the running precision is accumulated; the sum
/// is divided by the number of actual interactions.
pub fn average_precision(recommended: &[i64], actual: &HashSet<i64>) -> f32 {
    if actual.is_empty() {
        return 0.0;
    }
    let mut hits = 0_u32;
    let mut sum = 0.0_f32;
    for (i, id) in recommended.iter().enumerate() {
        if actual.contains(id) {
            hits += 1;
            sum += hits as f32 / (i + 1) as f32;
        }
    }
    sum / actual.len() as f32
}

/// Mean ranking quality of one evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RankingReport {
    pub precision_at_n: f32,
    pub recall_at_n: f32,
    pub ndcg_at_n: f32,
    pub map: f32,
}

impl RankingReport {
    pub fn is_zero(&self) -> bool {
        self.precision_at_n == 0.0
            && self.recall_at_n == 0.0
            && self.ndcg_at_n == 0.0
            && self.map == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actual(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn precision_counts_hits_over_n() {
        let recommended = [1, 2, 3, 4];
        let relevant = actual(&[2, 4, 9]);
        assert!((precision_at_n(&recommended, &relevant, 4) - 0.5).abs() < 1e-6);
        assert!((precision_at_n(&recommended, &relevant, 2) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn recall_counts_hits_over_actual() {
        let recommended = [1, 2, 3, 4];
        let relevant = actual(&[2, 4, 9]);
        let expected = 2.0 / 3.0;
        assert!((recall_at_n(&recommended, &relevant, 4) - expected).abs() < 1e-6);
    }

    #[test]
    fn perfect_ranking_has_ndcg_one() {
        let recommended = [5, 6, 7];
        let relevant = actual(&[5, 6, 7]);
        assert!((ndcg_at_n(&recommended, &relevant, 3) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn late_hit_is_discounted() {
        let relevant = actual(&[9]);
        let first = ndcg_at_n(&[9, 1, 2], &relevant, 3);
        let last = ndcg_at_n(&[1, 2, 9], &relevant, 3);
        assert!((first - 1.0).abs() < 1e-6);
        // Hit at rank 3: (1/log2(4)) / (1/log2(2)) = 0.5.
        assert!((last - 0.5).abs() < 1e-6);
    }

    #[test]
    fn average_precision_matches_hand_computation() {
        // Hits at ranks 1 and 3 of [1, 8, 2], actual {1, 2, 5}:
        // (1/1 + 2/3) / 3
        let relevant = actual(&[1, 2, 5]);
        let expected = (1.0 + 2.0 / 3.0) / 3.0;
        assert!((average_precision(&[1, 8, 2], &relevant) - expected).abs() < 1e-6);
    }

    #[test]
    fn empty_actual_set_yields_zero_not_nan() {
        let relevant = HashSet::new();
        assert_eq!(recall_at_n(&[1, 2], &relevant, 2), 0.0);
        assert_eq!(ndcg_at_n(&[1, 2], &relevant, 2), 0.0);
        assert_eq!(average_precision(&[1, 2], &relevant), 0.0);
    }
}

//! Hybrid Combiner
//!
//! Blends collaborative and content neighbor maps per item with a
//! dynamic alpha: items with few interactions lean on content
//! similarity, down to a configurable floor, so cold items still get
//! usable neighbors.

use std::collections::{HashMap, HashSet};

use shopmind_core::models::SimilarityPair;

use crate::collaborative::NeighborMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridNeighbor {
    pub neighbor_id: i64,
    pub hybrid_score: f32,
    pub cf_score: f32,
    pub content_score: f32,
}

/// Item id → ranked hybrid neighbor list.
pub type HybridNeighborMap = HashMap<i64, Vec<HybridNeighbor>>;

#[derive(Debug, Clone, Copy)]
pub struct HybridParams {
    /// Weight of the collaborative score for warm items.
    pub base_alpha: f32,
    /// Items with fewer interactions than this are treated as cold.
    pub cold_start_threshold: u32,
    /// Lower bound on the reduced alpha for cold items.
    pub min_alpha_floor: f32,
    pub top_k: usize,
    /// Hybrid scores at or below this are dropped after blending.
    pub final_hybrid_threshold: Option<f32>,
}

/// Collaborative weight for one item given its interaction count.
///
/// Warm items (count >= threshold) use `base_alpha` unchanged. Cold
/// items scale alpha by `count / threshold`, clamped below by
/// `min_alpha_floor`.
pub fn dynamic_alpha(
    base_alpha: f32,
    interaction_count: u32,
    cold_start_threshold: u32,
    min_alpha_floor: f32,
) -> f32 {
    if cold_start_threshold == 0 || interaction_count >= cold_start_threshold {
        return base_alpha;
    }
    let scaled = base_alpha * interaction_count as f32 / cold_start_threshold as f32;
    scaled.max(min_alpha_floor)
}

/// Blend the two neighbor maps.
///
/// The item key set is the union of both maps; per item the neighbor
/// id set is the union of both lists, with 0.0 for a source that does
/// not know the pair. Output lists follow the shared determinism
/// contract (score descending, ascending-id tie-break, truncated to
/// `top_k`). The optional final threshold filters neighbors but keeps
/// the item entry, so downstream code can tell "cold item, nothing
/// survived" from "item unknown".
pub fn combine(
    cf: &NeighborMap,
    content: &NeighborMap,
    interaction_counts: &HashMap<i64, u32>,
    params: &HybridParams,
) -> HybridNeighborMap {
    let items: HashSet<i64> = cf.keys().chain(content.keys()).copied().collect();

    let mut hybrid = HybridNeighborMap::with_capacity(items.len());
    for item in items {
        let count = interaction_counts.get(&item).copied().unwrap_or(0);
        let alpha = dynamic_alpha(
            params.base_alpha,
            count,
            params.cold_start_threshold,
            params.min_alpha_floor,
        );

        let mut merged: HashMap<i64, (f32, f32)> = HashMap::new();
        if let Some(neighbors) = cf.get(&item) {
            for &(neighbor_id, score) in neighbors {
                merged.entry(neighbor_id).or_insert((0.0, 0.0)).0 = score;
            }
        }
        if let Some(neighbors) = content.get(&item) {
            for &(neighbor_id, score) in neighbors {
                merged.entry(neighbor_id).or_insert((0.0, 0.0)).1 = score;
            }
        }

        let mut neighbors: Vec<HybridNeighbor> = merged
            .into_iter()
            .map(|(neighbor_id, (cf_score, content_score))| HybridNeighbor {
                neighbor_id,
                hybrid_score: (alpha * cf_score + (1.0 - alpha) * content_score).max(0.0),
                cf_score,
                content_score,
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.hybrid_score
                .partial_cmp(&a.hybrid_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.neighbor_id.cmp(&b.neighbor_id))
        });
        neighbors.truncate(params.top_k);

        if let Some(threshold) = params.final_hybrid_threshold {
            // Only scores strictly below the threshold are dropped.
            neighbors.retain(|n| n.hybrid_score >= threshold);
        }
        hybrid.insert(item, neighbors);
    }
    hybrid
}

/// Flatten a hybrid map into canonical unordered pairs for persistence.
///
/// Each (a, b) edge appears once as (min, max); when both directions
/// exist the first one seen wins. Self-pairs are dropped by
/// construction.
pub fn to_similarity_pairs(hybrid: &HybridNeighborMap) -> Vec<SimilarityPair> {
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut pairs = Vec::new();
    let mut items: Vec<&i64> = hybrid.keys().collect();
    items.sort();
    for &item in items {
        for neighbor in &hybrid[&item] {
            if let Some(pair) = SimilarityPair::new(
                item,
                neighbor.neighbor_id,
                neighbor.hybrid_score,
                neighbor.cf_score,
                neighbor.content_score,
            ) {
                if seen.insert((pair.product_id_1, pair.product_id_2)) {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_item_uses_base_alpha() {
        let alpha = dynamic_alpha(0.7, 20, 10, 0.1);
        assert!((alpha - 0.7).abs() < 1e-6);
    }

    #[test]
    fn cold_item_alpha_scales_down_to_floor() {
        // 2 of 10 interactions: 0.7 * 0.2 = 0.14.
        let alpha = dynamic_alpha(0.7, 2, 10, 0.1);
        assert!((alpha - 0.14).abs() < 1e-6);
        // 1 of 10: 0.07 clamps up to the floor.
        let floored = dynamic_alpha(0.7, 1, 10, 0.1);
        assert!((floored - 0.1).abs() < 1e-6);
    }

    fn params(top_k: usize) -> HybridParams {
        HybridParams {
            base_alpha: 0.5,
            cold_start_threshold: 0,
            min_alpha_floor: 0.0,
            top_k,
            final_hybrid_threshold: None,
        }
    }

    #[test]
    fn blends_union_of_neighbors_with_zero_for_missing_source() {
        let cf = NeighborMap::from([(1, vec![(2, 0.8)])]);
        let content = NeighborMap::from([(1, vec![(3, 0.6)])]);
        let hybrid = combine(&cf, &content, &HashMap::new(), &params(10));
        let neighbors = &hybrid[&1];
        assert_eq!(neighbors.len(), 2);
        let two = neighbors.iter().find(|n| n.neighbor_id == 2).unwrap();
        assert!((two.hybrid_score - 0.4).abs() < 1e-6);
        assert_eq!(two.content_score, 0.0);
        let three = neighbors.iter().find(|n| n.neighbor_id == 3).unwrap();
        assert!((three.hybrid_score - 0.3).abs() < 1e-6);
        assert_eq!(three.cf_score, 0.0);
    }

    #[test]
    fn threshold_filters_neighbors_but_keeps_item_entry() {
        let cf = NeighborMap::from([(1, vec![(2, 0.1)])]);
        let content = NeighborMap::new();
        let mut p = params(10);
        p.final_hybrid_threshold = Some(0.4);
        let hybrid = combine(&cf, &content, &HashMap::new(), &p);
        assert!(hybrid.contains_key(&1));
        assert!(hybrid[&1].is_empty());
    }

    #[test]
    fn neighbor_at_exactly_the_threshold_survives() {
        let cf = NeighborMap::from([(1, vec![(2, 0.8)])]);
        let content = NeighborMap::new();
        let p = HybridParams {
            base_alpha: 1.0,
            cold_start_threshold: 0,
            min_alpha_floor: 0.0,
            top_k: 10,
            final_hybrid_threshold: Some(0.8),
        };
        let hybrid = combine(&cf, &content, &HashMap::new(), &p);
        assert_eq!(hybrid[&1].len(), 1);
        assert_eq!(hybrid[&1][0].neighbor_id, 2);
    }

    #[test]
    fn combine_is_deterministic() {
        let cf = NeighborMap::from([(1, vec![(2, 0.5), (3, 0.5), (4, 0.9)])]);
        let content = NeighborMap::from([(1, vec![(5, 0.5)])]);
        let counts = HashMap::from([(1, 3_u32)]);
        let p = HybridParams {
            base_alpha: 0.6,
            cold_start_threshold: 5,
            min_alpha_floor: 0.1,
            top_k: 10,
            final_hybrid_threshold: None,
        };
        let first = combine(&cf, &content, &counts, &p);
        for _ in 0..10 {
            let again = combine(&cf, &content, &counts, &p);
            assert_eq!(first[&1], again[&1]);
        }
    }

    #[test]
    fn pair_flattening_is_canonical_and_deduplicated() {
        let neighbor = |id, score| HybridNeighbor {
            neighbor_id: id,
            hybrid_score: score,
            cf_score: score,
            content_score: score,
        };
        let hybrid = HybridNeighborMap::from([
            (1, vec![neighbor(2, 0.8)]),
            (2, vec![neighbor(1, 0.8)]),
        ]);
        let pairs = to_similarity_pairs(&hybrid);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].product_id_1, pairs[0].product_id_2), (1, 2));
    }
}

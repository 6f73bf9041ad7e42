//! MMR Diversifier
//!
//! Greedy Maximal Marginal Relevance reranking:
//! `mmr = λ * relevance - (1 - λ) * max_similarity_to_selected`.
//! Trims near-duplicate recommendations without touching the
//! relevance scores the caller computed.

use std::collections::HashMap;

use crate::collaborative::NeighborMap;

/// Symmetric pairwise similarity lookup, built from content neighbor
/// lists. Pairs absent from the lists are treated as dissimilar (0.0).
#[derive(Debug, Default, Clone)]
pub struct SimilarityLookup {
    pairs: HashMap<(i64, i64), f32>,
}

impl SimilarityLookup {
    pub fn from_neighbor_map(map: &NeighborMap) -> Self {
        let mut pairs = HashMap::new();
        for (&item, neighbors) in map {
            for &(neighbor, score) in neighbors {
                if item != neighbor {
                    pairs.insert((item.min(neighbor), item.max(neighbor)), score);
                }
            }
        }
        Self { pairs }
    }

    pub fn similarity(&self, a: i64, b: i64) -> f32 {
        self.pairs.get(&(a.min(b), a.max(b))).copied().unwrap_or(0.0)
    }
}

/// Greedily select up to `top_n` candidates by MMR score.
///
/// `candidates` must already be ranked by relevance; the first one is
/// always selected. Ties on the MMR score keep the first-seen
/// candidate, so equal-scored inputs preserve their relevance order.
/// Output rows carry the original relevance scores.
pub fn mmr_diversify(
    candidates: &[(i64, f32)],
    lookup: &SimilarityLookup,
    lambda: f32,
    top_n: usize,
) -> Vec<(i64, f32)> {
    let mut selected: Vec<(i64, f32)> = Vec::with_capacity(top_n.min(candidates.len()));
    let mut remaining: Vec<(i64, f32)> = candidates.to_vec();

    while selected.len() < top_n && !remaining.is_empty() {
        let mut best_index = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (index, &(candidate, relevance)) in remaining.iter().enumerate() {
            let max_similarity = selected
                .iter()
                .map(|&(chosen, _)| lookup.similarity(candidate, chosen))
                .fold(0.0_f32, f32::max);
            let mmr = lambda * relevance - (1.0 - lambda) * max_similarity;
            if mmr > best_score {
                best_score = mmr;
                best_index = index;
            }
        }
        selected.push(remaining.remove(best_index));
    }
    selected
}

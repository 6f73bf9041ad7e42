//! Collaborative Similarity Engine
//!
//! Item-to-item cosine similarity over the sparse user×item implicit
//! score matrix. The matrix is never densified: per-user co-occurrence
//! pairs accumulate the dot products directly.

use std::collections::HashMap;

use tracing::warn;

use shopmind_core::models::WeightedEvent;

/// Item id → ranked `(neighbor_id, similarity)` list, score descending
/// with ascending-id tie-break.
pub type NeighborMap = HashMap<i64, Vec<(i64, f32)>>;

/// Sort a neighbor list score-descending with ascending-id tie-break
/// and truncate to `top_k`. The shared determinism contract for every
/// neighbor list in the engine.
pub fn rank_neighbors(neighbors: &mut Vec<(i64, f32)>, top_k: usize) {
    neighbors.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    neighbors.truncate(top_k);
}

/// Compute item-item cosine similarity from scored events.
///
/// Only rows with `implicit_score > 0` participate. Duplicate
/// (user, item) entries sum, matching sparse construction from
/// coordinate triplets. Self-similarity is never emitted. Every active
/// item gets an entry, possibly empty after thresholding.
pub fn item_similarity(
    events: &[WeightedEvent],
    cosine_threshold: f32,
    top_k: usize,
) -> NeighborMap {
    // (user, item) → summed score
    let mut cells: HashMap<(i64, i64), f32> = HashMap::new();
    for event in events {
        if event.implicit_score > 0.0 {
            *cells.entry((event.user_id, event.product_id)).or_insert(0.0) +=
                event.implicit_score;
        }
    }

    if cells.is_empty() {
        warn!("no positive implicit scores, collaborative similarity is empty");
        return NeighborMap::new();
    }

    let mut user_rows: HashMap<i64, Vec<(i64, f32)>> = HashMap::new();
    let mut norms: HashMap<i64, f32> = HashMap::new();
    for ((user_id, product_id), score) in cells {
        user_rows.entry(user_id).or_default().push((product_id, score));
        *norms.entry(product_id).or_insert(0.0) += score * score;
    }
    for norm in norms.values_mut() {
        *norm = norm.sqrt();
    }

    // Accumulate dot products over item pairs co-rated by each user.
    let mut dots: HashMap<(i64, i64), f32> = HashMap::new();
    for row in user_rows.values_mut() {
        row.sort_by_key(|&(product_id, _)| product_id);
        for i in 0..row.len() {
            for j in (i + 1)..row.len() {
                let (a, va) = row[i];
                let (b, vb) = row[j];
                *dots.entry((a, b)).or_insert(0.0) += va * vb;
            }
        }
    }

    let mut similarities = NeighborMap::with_capacity(norms.len());
    for &product_id in norms.keys() {
        similarities.insert(product_id, Vec::new());
    }

    for ((a, b), dot) in dots {
        let norm_a = norms[&a];
        let norm_b = norms[&b];
        if norm_a == 0.0 || norm_b == 0.0 {
            continue;
        }
        let cosine = dot / (norm_a * norm_b);
        if cosine >= cosine_threshold {
            similarities.get_mut(&a).unwrap().push((b, cosine));
            similarities.get_mut(&b).unwrap().push((a, cosine));
        }
    }

    for neighbors in similarities.values_mut() {
        rank_neighbors(neighbors, top_k);
    }
    similarities
}

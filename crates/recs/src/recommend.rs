//! Recommendation Generator
//!
//! Turns the hybrid item-neighbor map into per-user ranked product
//! lists: aggregate neighbor scores across the user's interacted
//! seeds, drop already-purchased and blacklisted products, apply the
//! prediction threshold, then rerank with MMR.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use shopmind_core::models::{EventType, UserRecommendation, WeightedEvent};

use crate::diversity::{mmr_diversify, SimilarityLookup};
use crate::hybrid::HybridNeighborMap;

/// How a seed's own score influences its neighbors' candidate scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedAggregation {
    /// `score[candidate] += seed_score * hybrid_score`. Neighbors of
    /// strongly engaged seeds outrank neighbors of casual ones.
    SeedWeighted,
    /// `score[candidate] += hybrid_score`. Every seed counts equally.
    NeighborSum,
}

#[derive(Debug, Clone)]
pub struct RecommendationParams {
    pub prediction_threshold: f32,
    pub top_n: usize,
    pub mmr_lambda: f32,
    pub aggregation: SeedAggregation,
    pub blacklist: HashSet<i64>,
}

impl Default for RecommendationParams {
    fn default() -> Self {
        Self {
            prediction_threshold: 0.0,
            top_n: 15,
            mmr_lambda: 0.5,
            aggregation: SeedAggregation::SeedWeighted,
            blacklist: HashSet::new(),
        }
    }
}

/// One user's interaction summary: seed products with their aggregated
/// implicit scores, plus the purchased set used for exclusion.
#[derive(Debug, Default, Clone)]
pub struct UserHistory {
    pub seeds: Vec<(i64, f32)>,
    pub purchased: HashSet<i64>,
}

/// Summarize scored events per user. Seed scores sum per product and
/// clamp at 1.0; products whose rows all scored zero are not seeds.
pub fn build_histories(events: &[WeightedEvent]) -> HashMap<i64, UserHistory> {
    let mut seed_scores: HashMap<i64, HashMap<i64, f32>> = HashMap::new();
    let mut purchased: HashMap<i64, HashSet<i64>> = HashMap::new();
    for event in events {
        if event.implicit_score > 0.0 {
            let entry = seed_scores
                .entry(event.user_id)
                .or_default()
                .entry(event.product_id)
                .or_insert(0.0);
            *entry = (*entry + event.implicit_score).min(1.0);
        }
        if event.event_type == EventType::Purchase {
            purchased.entry(event.user_id).or_default().insert(event.product_id);
        }
    }

    let mut histories: HashMap<i64, UserHistory> = HashMap::new();
    for (user_id, scores) in seed_scores {
        let mut seeds: Vec<(i64, f32)> = scores.into_iter().collect();
        seeds.sort_by_key(|&(product_id, _)| product_id);
        histories.entry(user_id).or_default().seeds = seeds;
    }
    for (user_id, products) in purchased {
        histories.entry(user_id).or_default().purchased = products;
    }
    histories
}

/// Aggregate hybrid neighbor scores across a seed set into ranked
/// candidates, excluding `exclude` ids. Output follows the shared
/// determinism contract (score descending, ascending-id tie-break).
pub fn aggregate_candidates(
    seeds: &[(i64, f32)],
    hybrid: &HybridNeighborMap,
    aggregation: SeedAggregation,
    exclude: &HashSet<i64>,
) -> Vec<(i64, f32)> {
    let mut scores: HashMap<i64, f32> = HashMap::new();
    for &(seed, seed_score) in seeds {
        if let Some(neighbors) = hybrid.get(&seed) {
            for neighbor in neighbors {
                if exclude.contains(&neighbor.neighbor_id) {
                    continue;
                }
                let contribution = match aggregation {
                    SeedAggregation::SeedWeighted => seed_score * neighbor.hybrid_score,
                    SeedAggregation::NeighborSum => neighbor.hybrid_score,
                };
                *scores.entry(neighbor.neighbor_id).or_insert(0.0) += contribution;
            }
        }
    }
    let mut candidates: Vec<(i64, f32)> = scores.into_iter().collect();
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    candidates
}

/// Recommend up to `top_n` products for one user.
///
/// Users with no seeds (cold start) get an empty list; the caller
/// decides whether to back-fill from another source.
pub fn recommend_for_user(
    history: &UserHistory,
    hybrid: &HybridNeighborMap,
    lookup: &SimilarityLookup,
    params: &RecommendationParams,
) -> Vec<(i64, f32)> {
    if history.seeds.is_empty() {
        return Vec::new();
    }
    let mut candidates =
        aggregate_candidates(&history.seeds, hybrid, params.aggregation, &history.purchased);
    candidates.retain(|&(product_id, score)| {
        score >= params.prediction_threshold && !params.blacklist.contains(&product_id)
    });
    mmr_diversify(&candidates, lookup, params.mmr_lambda, params.top_n)
}

/// Generate recommendations for every user with history.
pub fn generate_recommendations(
    histories: &HashMap<i64, UserHistory>,
    hybrid: &HybridNeighborMap,
    lookup: &SimilarityLookup,
    params: &RecommendationParams,
) -> Vec<UserRecommendation> {
    let mut user_ids: Vec<&i64> = histories.keys().collect();
    user_ids.sort();

    let mut out = Vec::new();
    for &user_id in user_ids {
        let picks = recommend_for_user(&histories[&user_id], hybrid, lookup, params);
        debug!(user_id, count = picks.len(), "generated recommendations");
        for (product_id, score) in picks {
            out.push(UserRecommendation {
                user_id,
                product_id,
                score,
            });
        }
    }
    out
}

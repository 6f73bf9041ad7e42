//! Evaluation Harness
//!
//! Runs the full scoring → similarity → hybrid → per-user ranking
//! pipeline for one parameter vector and measures ranking quality
//! against a held-out split. Insufficient data at any stage produces
//! an all-zero report plus a warning, never an error: the optimizer
//! treats it as a bad trial and moves on.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::warn;

use shopmind_core::models::{Event, WeightedEvent};

use crate::collaborative::item_similarity;
use crate::content::{ContentSimilarityMatrix, NOISE_THRESHOLD};
use crate::hybrid::{combine, HybridNeighborMap, HybridParams};
use crate::metrics::{average_precision, ndcg_at_n, precision_at_n, recall_at_n, RankingReport};
use crate::optimize::TrialParams;
use crate::recommend::{aggregate_candidates, build_histories, SeedAggregation};
use crate::feedback::score_events;

/// Per-run inputs that do not change between trials.
pub struct EvalContext<'a> {
    /// Content similarity, absent when the embedding provider was
    /// unavailable.
    pub content: Option<&'a ContentSimilarityMatrix>,
}

/// Count events per item; used for the cold-start alpha reduction.
pub fn interaction_counts(events: &[WeightedEvent]) -> HashMap<i64, u32> {
    let mut counts: HashMap<i64, u32> = HashMap::new();
    for event in events {
        if event.implicit_score > 0.0 {
            *counts.entry(event.product_id).or_insert(0) += 1;
        }
    }
    counts
}

/// Build the hybrid neighbor map for one parameter vector.
///
/// The tunable cosine threshold applies to the collaborative engine
/// only; content similarity always uses the fixed noise floor, so a
/// high tuned threshold cannot strip the content signal cold items
/// depend on.
pub fn build_hybrid_map(
    scored: &[WeightedEvent],
    params: &TrialParams,
    ctx: &EvalContext<'_>,
) -> HybridNeighborMap {
    let cf = item_similarity(scored, params.cosine_threshold, params.top_k);
    let content = ctx
        .content
        .map(|matrix| matrix.top_k_neighbors(params.top_k, NOISE_THRESHOLD))
        .unwrap_or_default();
    let counts = interaction_counts(scored);
    combine(
        &cf,
        &content,
        &counts,
        &HybridParams {
            base_alpha: params.hybrid_alpha,
            cold_start_threshold: params.cold_start_threshold,
            min_alpha_floor: params.min_alpha_floor,
            top_k: params.top_k,
            final_hybrid_threshold: Some(params.final_hybrid_threshold),
        },
    )
}

/// Evaluate one parameter vector: train on `train`, measure on `eval`.
///
/// Qualifying users have at least one purchase in train and at least
/// one interaction in the eval split. For each, candidates are
/// aggregated from the user's train-period purchases over the hybrid
/// map, summing plain hybrid scores per neighbor, with the purchases
/// themselves excluded, truncated to `top_n`, and scored against the
/// user's eval products. Metrics are averaged over qualifying users.
/// The wider interacted-seed, engagement-weighted aggregation belongs
/// to the full-population generator, not to evaluation.
pub fn evaluate_trial(
    train: &[Event],
    eval_events: &[Event],
    params: &TrialParams,
    ctx: &EvalContext<'_>,
) -> RankingReport {
    if train.is_empty() || eval_events.is_empty() {
        warn!("empty train or eval split, reporting zero metrics");
        return RankingReport::default();
    }

    let scored = score_events(train, &params.weights(), params.frequency_decay);
    let hybrid = build_hybrid_map(&scored, params, ctx);
    if hybrid.is_empty() {
        warn!("hybrid similarity map is empty, reporting zero metrics");
        return RankingReport::default();
    }

    let histories = build_histories(&scored);

    let mut eval_products: HashMap<i64, HashSet<i64>> = HashMap::new();
    for event in eval_events {
        eval_products.entry(event.user_id).or_default().insert(event.product_id);
    }

    let qualifying: Vec<(&HashSet<i64>, &crate::recommend::UserHistory)> = eval_products
        .iter()
        .filter_map(|(user_id, actual)| {
            let history = histories.get(user_id)?;
            if history.purchased.is_empty() {
                return None;
            }
            Some((actual, history))
        })
        .collect();

    if qualifying.is_empty() {
        warn!("no users qualify for evaluation, reporting zero metrics");
        return RankingReport::default();
    }

    let totals: (f32, f32, f32, f32) = qualifying
        .par_iter()
        .map(|(actual, history)| {
            let mut seeds: Vec<(i64, f32)> =
                history.purchased.iter().map(|&product_id| (product_id, 1.0)).collect();
            seeds.sort_by_key(|&(product_id, _)| product_id);
            let candidates = aggregate_candidates(
                &seeds,
                &hybrid,
                SeedAggregation::NeighborSum,
                &history.purchased,
            );
            let recommended: Vec<i64> = candidates
                .iter()
                .take(params.top_n)
                .map(|&(product_id, _)| product_id)
                .collect();
            (
                precision_at_n(&recommended, actual, params.top_n),
                recall_at_n(&recommended, actual, params.top_n),
                ndcg_at_n(&recommended, actual, params.top_n),
                average_precision(&recommended, actual),
            )
        })
        .reduce(
            || (0.0, 0.0, 0.0, 0.0),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
        );

    let n = qualifying.len() as f32;
    RankingReport {
        precision_at_n: totals.0 / n,
        recall_at_n: totals.1 / n,
        ndcg_at_n: totals.2 / n,
        map: totals.3 / n,
    }
}

//! Implicit Feedback Scorer
//!
//! Turns raw behavioural events into implicit preference scores in
//! [0, 1]. Each event type carries a base weight; repeated events of
//! the same type on the same product boost the score logarithmically,
//! damped by a frequency decay factor.

use std::collections::HashMap;

use shopmind_core::models::{Event, EventType, WeightedEvent};

/// Base weights per event type, expressing relative preference strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWeights {
    pub view: f32,
    pub add_to_cart: f32,
    pub wishlist: f32,
    pub purchase: f32,
}

impl EventWeights {
    pub fn weight_for(&self, event_type: EventType) -> f32 {
        match event_type {
            EventType::View => self.view,
            EventType::AddToCart => self.add_to_cart,
            EventType::Wishlist => self.wishlist,
            EventType::Purchase => self.purchase,
        }
    }

    pub fn max_weight(&self) -> f32 {
        self.view
            .max(self.add_to_cart)
            .max(self.wishlist)
            .max(self.purchase)
    }
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            view: 0.1,
            add_to_cart: 0.5,
            wishlist: 0.3,
            purchase: 1.0,
        }
    }
}

/// Score every event row.
///
/// Steps:
/// 1. Count events per (user, product, event_type) group.
/// 2. Normalize base weights so the largest equals 1.0.
/// 3. `score = clip(base + base * ln(1 + count) * decay, 0, 1)`.
/// 4. Merge the group score back onto every original row.
///
/// Weights that are all zero produce all-zero scores (the normalizer
/// is treated as 1.0 to avoid a divide by zero).
pub fn score_events(
    events: &[Event],
    weights: &EventWeights,
    decay_factor: f32,
) -> Vec<WeightedEvent> {
    let mut counts: HashMap<(i64, i64, EventType), u32> = HashMap::new();
    for event in events {
        *counts
            .entry((event.user_id, event.product_id, event.event_type))
            .or_insert(0) += 1;
    }

    let max_weight = weights.max_weight();
    let normalizer = if max_weight > 0.0 { max_weight } else { 1.0 };

    let mut scores: HashMap<(i64, i64, EventType), f32> = HashMap::with_capacity(counts.len());
    for (key, count) in counts {
        let base = weights.weight_for(key.2) / normalizer;
        let boosted = base + base * (1.0 + count as f32).ln() * decay_factor;
        scores.insert(key, boosted.clamp(0.0, 1.0));
    }

    events
        .iter()
        .map(|event| {
            let key = (event.user_id, event.product_id, event.event_type);
            WeightedEvent {
                user_id: event.user_id,
                product_id: event.product_id,
                event_type: event.event_type,
                created_at: event.created_at,
                implicit_score: scores.get(&key).copied().unwrap_or(0.0),
            }
        })
        .collect()
}

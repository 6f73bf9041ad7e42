//! Domain models for the Shopmind recommender.
//!
//! Events are the immutable, append-only source records produced by
//! upstream tracking. Everything else is derived per run and fully
//! replaced on recomputation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracked user behaviour on a product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    AddToCart,
    Wishlist,
    Purchase,
}

impl EventType {
    /// Wire vocabulary used by the events table and the settings API.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::AddToCart => "add_to_cart",
            EventType::Wishlist => "wishlist",
            EventType::Purchase => "purchase",
        }
    }

    /// Parse the wire vocabulary. Unknown event types yield `None` so
    /// callers can skip rows instead of failing the whole load.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "view" => Some(EventType::View),
            "add_to_cart" => Some(EventType::AddToCart),
            "wishlist" => Some(EventType::Wishlist),
            "purchase" => Some(EventType::Purchase),
            _ => None,
        }
    }
}

/// Raw user event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: i64,
    pub product_id: i64,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
}

/// An event with its implicit preference score merged back on.
///
/// Every event row sharing the same (user, product, event_type) key
/// carries the same score; the score is recomputed whenever weights or
/// the decay factor change and is never persisted independently of the
/// events it derives from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEvent {
    pub user_id: i64,
    pub product_id: i64,
    pub event_type: EventType,
    pub created_at: DateTime<Utc>,
    pub implicit_score: f32,
}

/// Aggregated textual description of one product, produced by the
/// feature-source collaborator (brand, category, name, description and
/// category-relevant specification values concatenated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFeatures {
    pub product_id: i64,
    pub features_text: String,
}

/// Canonical unordered item pair with its similarity scores.
///
/// Invariant: `product_id_1 < product_id_2`; self-pairs are never
/// constructed. Built only at persistence time via [`SimilarityPair::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub product_id_1: i64,
    pub product_id_2: i64,
    pub score: f32,
    pub cf_score: f32,
    pub content_score: f32,
}

impl SimilarityPair {
    /// Normalize a directed pair to its canonical (min, max) form.
    /// Returns `None` for self-pairs.
    pub fn new(a: i64, b: i64, score: f32, cf_score: f32, content_score: f32) -> Option<Self> {
        if a == b {
            return None;
        }
        Some(Self {
            product_id_1: a.min(b),
            product_id_2: a.max(b),
            score,
            cf_score,
            content_score,
        })
    }
}

/// One recommended product for one user, ranked by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecommendation {
    pub user_id: i64,
    pub product_id: i64,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_wire_vocabulary() {
        for raw in ["view", "add_to_cart", "wishlist", "purchase"] {
            let parsed = EventType::parse(raw).unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
        assert!(EventType::parse("click").is_none());
    }

    #[test]
    fn similarity_pair_is_canonical() {
        let forward = SimilarityPair::new(7, 3, 0.5, 0.4, 0.6).unwrap();
        let backward = SimilarityPair::new(3, 7, 0.5, 0.4, 0.6).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.product_id_1, 3);
        assert_eq!(forward.product_id_2, 7);
    }

    #[test]
    fn similarity_pair_rejects_self_pairs() {
        assert!(SimilarityPair::new(5, 5, 1.0, 1.0, 1.0).is_none());
    }
}

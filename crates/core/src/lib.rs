//! # Shopmind Core
//!
//! Shared building blocks for the Shopmind recommender platform:
//! domain models for user events and similarity rows, the error
//! taxonomy, and environment-based configuration loading.

pub mod config;
pub mod error;
pub mod models;

pub use config::{ConfigLoader, DatabaseConfig};
pub use error::ShopmindError;
pub use models::{
    Event, EventType, ProductFeatures, SimilarityPair, UserRecommendation, WeightedEvent,
};

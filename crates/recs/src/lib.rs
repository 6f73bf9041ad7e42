//! Shopmind Recommendation Engine
//!
//! Hybrid item-to-item similarity for e-commerce: implicit feedback
//! scoring, collaborative and content-based similarity blended with a
//! cold-start-aware dynamic alpha, MMR diversification, a ranking
//! evaluation harness, and a black-box parameter optimizer. The
//! `recs-batch` binary runs the whole pipeline against Postgres.

pub mod collaborative;
pub mod content;
pub mod diversity;
pub mod evaluate;
pub mod feedback;
pub mod hybrid;
pub mod metrics;
pub mod optimize;
pub mod pipeline;
pub mod recommend;
pub mod report;
pub mod settings;
pub mod split;
pub mod store;

// Re-export key types
pub use collaborative::{item_similarity, NeighborMap};
pub use content::{ContentSimilarityMatrix, EmbeddingProvider, ProductEmbeddings};
pub use diversity::{mmr_diversify, SimilarityLookup};
pub use evaluate::{evaluate_trial, EvalContext};
pub use feedback::{score_events, EventWeights};
pub use hybrid::{combine, dynamic_alpha, HybridNeighbor, HybridNeighborMap, HybridParams};
pub use metrics::RankingReport;
pub use optimize::{OptimizationOutcome, Optimizer, SearchSpace, TrialParams};
pub use pipeline::PipelineConfig;
pub use recommend::{
    generate_recommendations, RecommendationParams, SeedAggregation, UserHistory,
};
pub use settings::RecommenderSettings;
pub use split::{split_time_based, SplitRatios, TemporalSplit};

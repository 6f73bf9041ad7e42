//! Batch pipeline orchestration.
//!
//! One run: load events and product features, split them temporally,
//! tune the parameter vector on the validation split, measure the
//! winner on the test split, push the report, then rebuild the
//! similarity and recommendation tables from the full history with
//! the winning parameters.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use shopmind_core::config::{parse_env_or, ConfigLoader};
use shopmind_core::error::{Result, ShopmindError};
use shopmind_core::DatabaseConfig;

use crate::content::{
    embed_products, ContentSimilarityMatrix, HttpEmbeddingProvider, NOISE_THRESHOLD,
};
use crate::diversity::SimilarityLookup;
use crate::evaluate::{build_hybrid_map, evaluate_trial, EvalContext};
use crate::feedback::score_events;
use crate::hybrid::to_similarity_pairs;
use crate::optimize::{OptimizationOutcome, Optimizer, TrialParams};
use crate::recommend::{
    build_histories, generate_recommendations, RecommendationParams, SeedAggregation,
};
use crate::report::{push_report, PerformanceReport};
use crate::settings::{fetch_settings, RecommenderSettings};
use crate::split::{split_time_based, SplitRatios};
use crate::store::{EventStore, FeatureStore, RecommendationStore, SimilarityStore};

/// Batch run configuration.
///
/// # Environment Variables
///
/// - `SHOPMIND_SETTINGS_URL` (optional; defaults used when unset)
/// - `SHOPMIND_REPORT_URL` (optional; report skipped when unset)
/// - `SHOPMIND_EMBEDDING_URL` (optional; content engine skipped when unset)
/// - `SHOPMIND_OPTIMAL_PARAMS_PATH` (optional, default: `optimal_params.json`)
/// - `SHOPMIND_OPTIMIZER_CALLS` (optional, default: 50)
/// - `SHOPMIND_OPTIMIZER_SEED` (optional, default: 42)
/// - `SHOPMIND_SPLIT_TRAIN` / `_VAL` / `_TEST` (optional, default: 0.6/0.2/0.2)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database: DatabaseConfig,
    pub settings_url: Option<String>,
    pub report_url: Option<String>,
    pub embedding_url: Option<String>,
    pub optimal_params_path: PathBuf,
    pub optimizer_calls: usize,
    pub optimizer_seed: u64,
    pub split_ratios: SplitRatios,
}

impl ConfigLoader for PipelineConfig {
    fn from_env() -> Result<Self> {
        let database = DatabaseConfig::from_env()?;
        let split_ratios = SplitRatios::new(
            parse_env_or("SHOPMIND_SPLIT_TRAIN", 0.6)?,
            parse_env_or("SHOPMIND_SPLIT_VAL", 0.2)?,
            parse_env_or("SHOPMIND_SPLIT_TEST", 0.2)?,
        )?;
        Ok(Self {
            database,
            settings_url: std::env::var("SHOPMIND_SETTINGS_URL").ok(),
            report_url: std::env::var("SHOPMIND_REPORT_URL").ok(),
            embedding_url: std::env::var("SHOPMIND_EMBEDDING_URL").ok(),
            optimal_params_path: std::env::var("SHOPMIND_OPTIMAL_PARAMS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("optimal_params.json")),
            optimizer_calls: parse_env_or("SHOPMIND_OPTIMIZER_CALLS", 50)?,
            optimizer_seed: parse_env_or("SHOPMIND_OPTIMIZER_SEED", 42)?,
            split_ratios,
        })
    }

    fn validate(&self) -> Result<()> {
        self.database.validate()?;
        if self.optimizer_calls == 0 {
            return Err(ShopmindError::Configuration(
                "optimizer_calls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Winning parameter vector, written next to the run so the next
/// invocation (or an operator) can inspect or reuse it.
#[derive(Debug, Serialize, Deserialize)]
pub struct OptimalParamsDoc {
    pub params: TrialParams,
    pub validation_ndcg: f32,
    pub generated_at: DateTime<Utc>,
}

pub fn save_optimal_params(path: &Path, outcome: &OptimizationOutcome) -> Result<()> {
    let doc = OptimalParamsDoc {
        params: outcome.best,
        validation_ndcg: -outcome.best_objective,
        generated_at: Utc::now(),
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|err| ShopmindError::Internal(err.to_string()))?;
    std::fs::write(path, json)
        .map_err(|err| ShopmindError::Internal(format!("cannot write {path:?}: {err}")))?;
    info!(?path, "optimal parameters saved");
    Ok(())
}

/// Run the full batch pipeline.
pub async fn run(config: &PipelineConfig) -> Result<()> {
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.connect_timeout)
        .connect(&config.database.url)
        .await?;
    let http = reqwest::Client::new();

    let settings = match &config.settings_url {
        Some(url) => fetch_settings(&http, url).await,
        None => RecommenderSettings::default(),
    };

    let events = EventStore::new(pool.clone()).load_events().await?;
    if events.is_empty() {
        warn!("no events to process, leaving derived tables untouched");
        return Ok(());
    }

    let features = FeatureStore::new(pool.clone()).load_product_features().await?;
    let content_matrix = match &config.embedding_url {
        Some(url) => {
            let provider = HttpEmbeddingProvider::new(url.clone());
            let features = features.clone();
            let embeddings =
                tokio::task::spawn_blocking(move || embed_products(&provider, &features))
                    .await
                    .map_err(|err| ShopmindError::Internal(err.to_string()))??;
            embeddings.map(|e| ContentSimilarityMatrix::compute(&e))
        }
        None => {
            warn!("no embedding endpoint configured, running collaborative-only");
            None
        }
    };
    let ctx = EvalContext {
        content: content_matrix.as_ref(),
    };

    // Tune on validation, report on test.
    let split = split_time_based(events.clone(), &config.split_ratios);
    info!(
        train = split.train.len(),
        val = split.val.len(),
        test = split.test.len(),
        "temporal split"
    );

    let optimizer = Optimizer {
        n_calls: config.optimizer_calls,
        seed: config.optimizer_seed,
        ..Optimizer::default()
    };
    let outcome =
        optimizer.minimize(|params| -evaluate_trial(&split.train, &split.val, params, &ctx).ndcg_at_n);
    save_optimal_params(&config.optimal_params_path, &outcome)?;

    let mut train_and_val = split.train.clone();
    train_and_val.extend(split.val.iter().cloned());
    let test_report = evaluate_trial(&train_and_val, &split.test, &outcome.best, &ctx);
    info!(?test_report, "test split metrics");
    if let Some(url) = &config.report_url {
        push_report(&http, url, &PerformanceReport::new(test_report, outcome.best)).await;
    }

    // Rebuild the derived tables from the full history. Weights and
    // blending come from the tuned vector; list breadth and the
    // collaborative threshold are operational settings.
    let mut build = outcome.best;
    build.top_k = settings.top_k;
    build.cosine_threshold = settings.cosine_threshold;
    let scored = score_events(&events, &build.weights(), build.frequency_decay);
    let hybrid = build_hybrid_map(&scored, &build, &ctx);
    let pairs = to_similarity_pairs(&hybrid);
    SimilarityStore::new(pool.clone())
        .replace_all(&pairs, settings.batch_size)
        .await?;

    let content_neighbors = content_matrix
        .as_ref()
        .map(|matrix| matrix.top_k_neighbors(settings.top_k, NOISE_THRESHOLD))
        .unwrap_or_default();
    let lookup = SimilarityLookup::from_neighbor_map(&content_neighbors);
    let histories = build_histories(&scored);
    let recommendations = generate_recommendations(
        &histories,
        &hybrid,
        &lookup,
        &RecommendationParams {
            prediction_threshold: build.final_hybrid_threshold,
            top_n: settings.top_n,
            mmr_lambda: 0.5,
            aggregation: SeedAggregation::SeedWeighted,
            blacklist: settings.product_blacklist.iter().copied().collect::<HashSet<_>>(),
        },
    );
    RecommendationStore::new(pool).save_all(&recommendations).await?;

    info!("batch pipeline finished");
    Ok(())
}

//! Shopmind batch recommender.
//!
//! Recomputes product similarities and per-user recommendations from
//! the tracked event history. Intended to run on a schedule; every run
//! fully replaces the derived tables.

use tracing::{error, info};

use shopmind_core::config::ConfigLoader;
use shopmind_recs::pipeline::{self, PipelineConfig};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .json()
        .init();

    dotenvy::dotenv().ok();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!("starting batch recommendation run");
    match pipeline::run(&config).await {
        Ok(()) => {
            info!("batch recommendation run complete");
            std::process::ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "batch recommendation run failed");
            std::process::ExitCode::FAILURE
        }
    }
}

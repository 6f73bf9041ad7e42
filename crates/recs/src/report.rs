//! Performance report push.
//!
//! After the final test-split evaluation, the metrics and the chosen
//! parameters are POSTed to an internal dashboard endpoint.
//! Fire-and-forget: a dashboard outage must not abort a batch run
//! whose real output is the rebuilt similarity and recommendation
//! tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::metrics::RankingReport;
use crate::optimize::TrialParams;

#[derive(Debug, Serialize)]
pub struct PerformanceReport {
    pub metrics: RankingReport,
    pub params: TrialParams,
    pub evaluated_users_split: &'static str,
    pub generated_at: DateTime<Utc>,
}

impl PerformanceReport {
    pub fn new(metrics: RankingReport, params: TrialParams) -> Self {
        Self {
            metrics,
            params,
            evaluated_users_split: "test",
            generated_at: Utc::now(),
        }
    }
}

/// POST the report; log and continue on any failure.
pub async fn push_report(client: &reqwest::Client, url: &str, report: &PerformanceReport) {
    match client.post(url).json(report).send().await {
        Ok(response) if response.status().is_success() => {
            info!(url, "performance report pushed");
        }
        Ok(response) => {
            warn!(url, status = %response.status(), "performance report rejected");
        }
        Err(err) => {
            warn!(url, %err, "performance report push failed");
        }
    }
}

//! Remote recommender settings.
//!
//! Operational knobs (batch sizes, list lengths, the product
//! blacklist) live in an admin-editable settings API. They are fetched
//! once at startup and fall back to hardcoded defaults when the API is
//! unreachable or a value fails to parse, so a broken settings row can
//! never stop the batch run.

use serde::Deserialize;
use tracing::{info, warn};

/// Typed settings with their fallback defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderSettings {
    /// Rows per similarity insert batch.
    pub batch_size: usize,
    /// Neighbors kept per item.
    pub top_k: usize,
    /// Recommendations stored per user.
    pub top_n: usize,
    /// Noise floor for content similarity.
    pub cosine_threshold: f32,
    /// Product ids never recommended.
    pub product_blacklist: Vec<i64>,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            top_k: 10,
            top_n: 15,
            cosine_threshold: 0.1,
            product_blacklist: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct SettingsResponse {
    status: String,
    #[serde(default)]
    data: Vec<SettingRow>,
}

#[derive(Deserialize)]
struct SettingRow {
    key: String,
    value: String,
    data_type: String,
}

impl RecommenderSettings {
    fn apply(&mut self, row: &SettingRow) {
        match (row.key.as_str(), row.data_type.as_str()) {
            ("BATCH_SIZE", "integer") => match row.value.parse() {
                Ok(v) => self.batch_size = v,
                Err(_) => warn!(value = %row.value, "unparseable BATCH_SIZE, keeping default"),
            },
            ("TOP_K", "integer") => match row.value.parse() {
                Ok(v) => self.top_k = v,
                Err(_) => warn!(value = %row.value, "unparseable TOP_K, keeping default"),
            },
            ("TOP_N_RECOMMENDATIONS", "integer") => match row.value.parse() {
                Ok(v) => self.top_n = v,
                Err(_) => {
                    warn!(value = %row.value, "unparseable TOP_N_RECOMMENDATIONS, keeping default")
                }
            },
            ("COSINE_THRESHOLD", "float") => match row.value.parse() {
                Ok(v) => self.cosine_threshold = v,
                Err(_) => {
                    warn!(value = %row.value, "unparseable COSINE_THRESHOLD, keeping default")
                }
            },
            ("PRODUCT_BLACKLIST", "list") => {
                // Comma-separated ids; bad entries are skipped.
                self.product_blacklist = row
                    .value
                    .split(',')
                    .filter_map(|part| part.trim().parse().ok())
                    .collect();
            }
            _ => {}
        }
    }

    fn from_rows(rows: &[SettingRow]) -> Self {
        let mut settings = Self::default();
        for row in rows {
            settings.apply(row);
        }
        settings
    }
}

/// Fetch settings from the API, falling back to defaults on any
/// failure.
pub async fn fetch_settings(client: &reqwest::Client, url: &str) -> RecommenderSettings {
    let response = match client.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(r) => r,
        Err(err) => {
            warn!(%err, "settings API unreachable, using defaults");
            return RecommenderSettings::default();
        }
    };
    let payload: SettingsResponse = match response.json().await {
        Ok(p) => p,
        Err(err) => {
            warn!(%err, "settings API returned malformed payload, using defaults");
            return RecommenderSettings::default();
        }
    };
    if payload.status != "success" {
        warn!(status = %payload.status, "settings API reported failure, using defaults");
        return RecommenderSettings::default();
    }
    let settings = RecommenderSettings::from_rows(&payload.data);
    info!(?settings, "loaded recommender settings");
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str, data_type: &str) -> SettingRow {
        SettingRow {
            key: key.to_string(),
            value: value.to_string(),
            data_type: data_type.to_string(),
        }
    }

    #[test]
    fn typed_rows_override_defaults() {
        let settings = RecommenderSettings::from_rows(&[
            row("BATCH_SIZE", "250", "integer"),
            row("COSINE_THRESHOLD", "0.25", "float"),
            row("PRODUCT_BLACKLIST", "3, 9,12", "list"),
        ]);
        assert_eq!(settings.batch_size, 250);
        assert!((settings.cosine_threshold - 0.25).abs() < 1e-6);
        assert_eq!(settings.product_blacklist, vec![3, 9, 12]);
        // Untouched keys keep their defaults.
        assert_eq!(settings.top_k, 10);
        assert_eq!(settings.top_n, 15);
    }

    #[test]
    fn unparseable_values_keep_defaults() {
        let settings = RecommenderSettings::from_rows(&[
            row("BATCH_SIZE", "lots", "integer"),
            row("TOP_K", "7", "integer"),
        ]);
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.top_k, 7);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings = RecommenderSettings::from_rows(&[row("SHINY_NEW_KNOB", "1", "integer")]);
        assert_eq!(settings, RecommenderSettings::default());
    }

    #[test]
    fn unreachable_api_falls_back_to_defaults() {
        let client = reqwest::Client::new();
        // Port 1 refuses connections immediately.
        let settings =
            tokio_test::block_on(fetch_settings(&client, "http://127.0.0.1:1/settings"));
        assert_eq!(settings, RecommenderSettings::default());
    }
}

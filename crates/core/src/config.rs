//! Environment-based configuration loading.
//!
//! All Shopmind configuration comes from environment variables with the
//! `SHOPMIND_` prefix, with `.env` support via dotenvy. The override
//! hierarchy is: defaults < .env < environment.
//!
//! # Example
//!
//! ```no_run
//! use shopmind_core::config::{ConfigLoader, DatabaseConfig};
//!
//! dotenvy::dotenv().ok();
//! let db = DatabaseConfig::from_env().unwrap();
//! db.validate().unwrap();
//! ```

use crate::error::ShopmindError;
use std::time::Duration;

/// Configuration loader trait.
///
/// Standardized loading and validation of a configuration section from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, applying defaults
    /// for missing optional values.
    fn from_env() -> Result<Self, ShopmindError>;

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ShopmindError>;
}

/// PostgreSQL connection configuration.
///
/// # Environment Variables
///
/// - `SHOPMIND_DATABASE_URL` (required, falls back to `DATABASE_URL`)
/// - `SHOPMIND_DATABASE_MAX_CONNECTIONS` (optional, default: 10)
/// - `SHOPMIND_DATABASE_CONNECT_TIMEOUT` (optional, seconds, default: 30)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/shopmind".to_string(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, ShopmindError> {
        let url = std::env::var("SHOPMIND_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                ShopmindError::Configuration(
                    "SHOPMIND_DATABASE_URL or DATABASE_URL must be set".to_string(),
                )
            })?;

        let max_connections = parse_env_or("SHOPMIND_DATABASE_MAX_CONNECTIONS", 10)?;
        let connect_timeout_secs = parse_env_or("SHOPMIND_DATABASE_CONNECT_TIMEOUT", 30u64)?;

        Ok(Self {
            url,
            max_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), ShopmindError> {
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ShopmindError::Configuration(format!(
                "database URL must be a postgres:// URL, got '{}'",
                self.url
            )));
        }
        if self.max_connections == 0 {
            return Err(ShopmindError::Configuration(
                "database max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an optional environment variable, falling back to `default`
/// when unset. A set-but-unparseable value is a configuration error.
pub fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ShopmindError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ShopmindError::Configuration(format!("cannot parse {key}='{raw}'"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_non_postgres_url() {
        let config = DatabaseConfig {
            url: "mysql://localhost/shopmind".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_default() {
        assert!(DatabaseConfig::default().validate().is_ok());
    }
}

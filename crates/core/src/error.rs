//! Error taxonomy shared across Shopmind crates.
//!
//! "Not enough data" is deliberately not an error: empty event sets,
//! empty similarity maps and zero qualifying evaluation users are
//! expected runtime conditions and are surfaced as empty/zero results
//! plus a log line. Only structurally invalid input (bad ratios,
//! unparseable configuration) or failed collaborators produce an `Err`.

pub type Result<T> = std::result::Result<T, ShopmindError>;

#[derive(Debug, thiserror::Error)]
pub enum ShopmindError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ShopmindError {
    fn from(err: sqlx::Error) -> Self {
        ShopmindError::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ShopmindError {
    fn from(err: anyhow::Error) -> Self {
        ShopmindError::Internal(err.to_string())
    }
}

//! Error types for risk engine

use thiserror::Error;

/// Risk engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Ledger rejected a record or an invariant failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] credit_ledger::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Applicant profile rejected
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Purchase request rejected
    #[error("Invalid purchase: {0}")]
    InvalidPurchase(String),

    /// Calculation error
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

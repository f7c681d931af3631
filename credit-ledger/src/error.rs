//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Record failed validation at ingestion
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Record ID already present in the ledger
    #[error("Duplicate record: {0}")]
    DuplicateRecord(String),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Payment already in a terminal status
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// Invariant violation (limit bounds, limit chain, revisions)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Installment plan terms rejected
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

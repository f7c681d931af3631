//! Credit Ledger
//!
//! Append-only account history for a buy-now-pay-later credit line.
//!
//! # Architecture
//!
//! - **Event History**: Payments, transactions, risk snapshots and limit
//!   changes are appended, never edited or removed
//! - **Single Writer**: An [`Account`] is mutated through `&mut` only, so one
//!   scoring and adjustment pass runs at a time per account
//! - **Revisions**: Every history-changing append bumps a revision counter that
//!   downstream scoring uses to detect "nothing changed"
//!
//! # Invariants
//!
//! - Limit bounds: `ceil(initial × 0.5) ≤ credit_limit ≤ initial × 2`
//! - Append-only: records are never modified, except the single
//!   `pending → paid | missed` settlement of a payment
//! - Deterministic replay: restoring a snapshot re-validates every record

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod ledger;
pub mod account;
pub mod plan;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    AccountId, FactorScores, LimitChangeRecord, PaymentId, PaymentRecord, PaymentStatus,
    RiskSnapshot, SnapshotSource, TransactionId, TransactionRecord, MAX_AMOUNT,
};
pub use ledger::HistoryLedger;
pub use account::{Account, AccountSnapshot};
pub use plan::{InstallmentPlan, MAX_PLAN_MONTHS};

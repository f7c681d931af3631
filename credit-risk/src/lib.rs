//! Credit Risk Engine
//!
//! Scores a buy-now-pay-later account from its payment and purchase history
//! and moves its credit limit by risk tier.
//!
//! # Pipeline
//!
//! 1. [`factors`] derive five sub-scores in `[0, 1]` from the ledger
//! 2. [`RiskScorer`] combines them with fixed weights into a [`RiskScore`]
//! 3. [`LimitAdjuster`] maps the score to a [`RiskLevel`], scales the limit
//!    and records the snapshot and limit change on the account
//!
//! Higher scores mean lower risk throughout.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod types;
pub mod config;
pub mod factors;
pub mod scoring;
pub mod limits;
pub mod onboarding;
pub mod affordability;
pub mod metrics;

pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use scoring::{RiskScorer, Scorecard};
pub use limits::LimitAdjuster;
pub use onboarding::{open_account, ApplicantProfile};
pub use affordability::{AffordabilityChecker, PurchaseCheck, Warning, WarningKind};
pub use metrics::Metrics;

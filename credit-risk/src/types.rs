//! Core types for risk engine

use chrono::{DateTime, Utc};
use credit_ledger::{AccountId, FactorScores};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk score in `[0, 1]`; higher means lower credit risk
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    /// Create new risk score, clamped to `[0, 1]` (NaN becomes 0)
    pub fn new(score: f64) -> Self {
        if score.is_nan() {
            Self(0.0)
        } else {
            Self(score.clamp(0.0, 1.0))
        }
    }

    /// Get raw score
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Low risk: limit grows
    Low,
    /// Medium risk: limit holds
    Medium,
    /// High risk: limit shrinks
    High,
    /// Critical risk: limit halves
    Critical,
}

impl RiskLevel {
    /// Upper-case tier name
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a limit move inside an [`Assessment`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitChange {
    /// Signed change (`new - old`)
    pub amount: Decimal,

    /// Signed change as a percentage of the old limit
    pub percentage: f64,

    /// Human-readable reason
    pub reason: String,
}

/// Outcome of a scoring and adjustment pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    /// Account assessed
    pub account_id: AccountId,

    /// Weighted risk score
    pub risk_score: RiskScore,

    /// Tier the score falls in
    pub risk_level: RiskLevel,

    /// Sub-score breakdown
    pub factors: FactorScores,

    /// Tier multiplier applied to the limit
    pub adjustment: Decimal,

    /// Limit before the pass
    pub previous_credit_limit: Decimal,

    /// Limit after the pass
    pub new_credit_limit: Decimal,

    /// Present only when the limit moved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_change: Option<LimitChange>,

    /// Ledger revision the pass read
    pub revision: u64,

    /// Assessment timestamp
    pub assessed_at: DateTime<Utc>,
}

impl Assessment {
    /// True if the limit went up
    pub fn increased(&self) -> bool {
        self.new_credit_limit > self.previous_credit_limit
    }

    /// True if the limit went down
    pub fn decreased(&self) -> bool {
        self.new_credit_limit < self.previous_credit_limit
    }
}

//! Risk scoring engine

use crate::{
    config::{FactorConfig, RiskWeights},
    factors::compute_factors,
    Result, RiskScore,
};
use chrono::{DateTime, Utc};
use credit_ledger::{Account, FactorScores};
use tracing::debug;

/// Factors plus their weighted total
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scorecard {
    /// Sub-scores
    pub factors: FactorScores,
    /// Weighted, clamped total
    pub risk_score: RiskScore,
}

/// Risk scorer
#[derive(Debug, Clone)]
pub struct RiskScorer {
    weights: RiskWeights,
    factors: FactorConfig,
}

impl RiskScorer {
    /// Create new risk scorer
    pub fn new(weights: RiskWeights, factors: FactorConfig) -> Result<Self> {
        weights.validate()?;
        factors.validate()?;
        Ok(Self { weights, factors })
    }

    /// Factor parameters in use
    pub fn factor_config(&self) -> &FactorConfig {
        &self.factors
    }

    /// Weighted sum of sub-scores, clamped to `[0, 1]`
    pub fn combine(&self, factors: &FactorScores) -> RiskScore {
        let w = &self.weights;
        let total = factors.missed_payments * w.missed_payments
            + factors.payment_history * w.payment_history
            + factors.transaction_patterns * w.transaction_patterns
            + factors.credit_utilization * w.credit_utilization
            + factors.account_age * w.account_age;

        RiskScore::new(if total.is_finite() { total } else { 0.0 })
    }

    /// Score an account's current history
    pub fn score(&self, account: &Account, as_of: DateTime<Utc>) -> Scorecard {
        let factors = compute_factors(account, &self.factors, as_of);
        let risk_score = self.combine(&factors);

        debug!(
            account_id = %account.id(),
            missed_payments = factors.missed_payments,
            payment_history = factors.payment_history,
            transaction_patterns = factors.transaction_patterns,
            credit_utilization = factors.credit_utilization,
            account_age = factors.account_age,
            risk_score = risk_score.value(),
            "Scored account"
        );

        Scorecard {
            factors,
            risk_score,
        }
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            factors: FactorConfig::default(),
        }
    }
}

//! Credit limit adjustment
//!
//! Maps a risk score to a tier, multiplies the current limit by the tier's
//! multiplier, rounds to a whole amount and clamps into the account's bounds.
//!
//! # Idempotence
//!
//! [`LimitAdjuster::apply`] stamps its outputs with the ledger revision it
//! read. When called again before any new payment, settlement or purchase
//! arrives, it rebuilds the previous outcome from those outputs instead of
//! scoring again, so the limit is not compounded and nothing is appended.

use crate::{
    config::{Config, TierConfig},
    factors::weakest_factor,
    metrics::Metrics,
    scoring::RiskScorer,
    Assessment, LimitChange, Result, RiskLevel, RiskScore,
};
use chrono::{DateTime, Utc};
use credit_ledger::{Account, LimitChangeRecord, SnapshotSource};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

/// Limit adjuster
#[derive(Debug, Clone)]
pub struct LimitAdjuster {
    scorer: RiskScorer,
    tiers: TierConfig,
    metrics: Option<Metrics>,
}

impl LimitAdjuster {
    /// Create new limit adjuster
    pub fn new(scorer: RiskScorer, tiers: TierConfig) -> Result<Self> {
        tiers.validate()?;
        Ok(Self {
            scorer,
            tiers,
            metrics: None,
        })
    }

    /// Create from a full configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let scorer = RiskScorer::new(config.weights, config.factors.clone())?;
        Self::new(scorer, config.tiers)
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Underlying scorer
    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Tier for a score
    pub fn classify(&self, score: RiskScore) -> RiskLevel {
        self.tiers.classify(score.value())
    }

    /// `round(current × multiplier)` clamped into the account's bounds
    pub fn target_limit(&self, account: &Account, level: RiskLevel) -> Decimal {
        // Multipliers are positive, so an overflowing product is above the ceiling
        let proposed = account
            .credit_limit()
            .checked_mul(self.tiers.multiplier(level))
            .map_or(account.max_limit(), |limit| {
                limit.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            });
        account.clamp_limit(proposed).normalize()
    }

    /// Assess without touching the account
    ///
    /// Returns exactly what [`apply`](Self::apply) would return.
    pub fn evaluate(&self, account: &Account, as_of: DateTime<Utc>) -> Assessment {
        self.replay(account)
            .unwrap_or_else(|| self.assess(account, as_of))
    }

    /// Score the account, record the snapshot and move the limit
    pub fn apply(&self, account: &mut Account, as_of: DateTime<Utc>) -> Result<Assessment> {
        if let Some(previous) = self.replay(account) {
            debug!(
                account_id = %account.id(),
                revision = previous.revision,
                "History unchanged since last assessment"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_noop();
            }
            return Ok(previous);
        }

        let assessment = self.assess(account, as_of);

        account.append_risk_snapshot(
            assessment.assessed_at,
            assessment.risk_score.value(),
            SnapshotSource::Scorecard,
            Some(assessment.factors),
        )?;

        if let Some(change) = &assessment.limit_change {
            account.apply_limit_change(LimitChangeRecord::new(
                assessment.assessed_at,
                assessment.previous_credit_limit,
                assessment.new_credit_limit,
                change.reason.clone(),
                assessment.revision,
            ))?;
        }

        info!(
            account_id = %account.id(),
            risk_score = %assessment.risk_score,
            risk_level = %assessment.risk_level,
            previous_limit = %assessment.previous_credit_limit,
            new_limit = %assessment.new_credit_limit,
            "Risk assessment applied"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_assessment(&assessment);
        }

        Ok(assessment)
    }

    fn assess(&self, account: &Account, as_of: DateTime<Utc>) -> Assessment {
        let card = self.scorer.score(account, as_of);
        let risk_level = self.classify(card.risk_score);
        let previous = account.credit_limit();
        let new_limit = self.target_limit(account, risk_level);

        let limit_change = (new_limit != previous).then(|| {
            let record = LimitChangeRecord::new(as_of, previous, new_limit, String::new(), 0);
            let (factor, value) = weakest_factor(&card.factors);
            LimitChange {
                amount: record.amount,
                percentage: record.percentage_change,
                reason: format!(
                    "{} risk tier (score {}): limit {} by {:.1}%, weakest factor {} ({:.2})",
                    risk_level,
                    card.risk_score,
                    if record.is_increase() { "increased" } else { "decreased" },
                    record.percentage_change.abs(),
                    factor,
                    value
                ),
            }
        });

        Assessment {
            account_id: account.id().clone(),
            risk_score: card.risk_score,
            risk_level,
            factors: card.factors,
            adjustment: self.tiers.multiplier(risk_level),
            previous_credit_limit: previous,
            new_credit_limit: new_limit,
            limit_change,
            revision: account.ledger().revision(),
            assessed_at: as_of,
        }
    }

    /// Rebuild the last outcome if no history arrived since it was applied
    fn replay(&self, account: &Account) -> Option<Assessment> {
        let ledger = account.ledger();
        let snapshot = ledger.latest_scorecard()?;
        if snapshot.revision != ledger.revision() {
            return None;
        }
        let factors = snapshot.factors?;

        let risk_score = RiskScore::new(snapshot.score);
        let risk_level = self.classify(risk_score);

        let change = ledger
            .limit_changes()
            .last()
            .filter(|c| c.revision == snapshot.revision && c.date == snapshot.date);

        Some(Assessment {
            account_id: account.id().clone(),
            risk_score,
            risk_level,
            factors,
            adjustment: self.tiers.multiplier(risk_level),
            previous_credit_limit: change.map_or(account.credit_limit(), |c| c.old_limit),
            new_credit_limit: account.credit_limit(),
            limit_change: change.map(|c| LimitChange {
                amount: c.amount,
                percentage: c.percentage_change,
                reason: c.reason.clone(),
            }),
            revision: snapshot.revision,
            assessed_at: snapshot.date,
        })
    }
}

impl Default for LimitAdjuster {
    fn default() -> Self {
        Self {
            scorer: RiskScorer::default(),
            tiers: TierConfig::default(),
            metrics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use credit_ledger::{AccountId, PaymentId, PaymentRecord};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn account(limit: i64) -> Account {
        Account::open(AccountId::new("acct"), Decimal::from(limit), t0()).unwrap()
    }

    #[test]
    fn test_target_limit_rounds_then_clamps() {
        let adjuster = LimitAdjuster::default();
        let acct = account(10_001);

        // 10001 × 1.2 = 12001.2 -> 12001
        assert_eq!(adjuster.target_limit(&acct, RiskLevel::Low), Decimal::from(12_001));
        // 10001 × 0.8 = 8000.8 -> 8001
        assert_eq!(adjuster.target_limit(&acct, RiskLevel::High), Decimal::from(8_001));
        // 10001 × 0.5 = 5000.5 -> 5001 (also the floor)
        assert_eq!(adjuster.target_limit(&acct, RiskLevel::Critical), Decimal::from(5_001));
        assert_eq!(adjuster.target_limit(&acct, RiskLevel::Medium), Decimal::from(10_001));
    }

    #[test]
    fn test_new_account_grows_then_replays() {
        let adjuster = LimitAdjuster::default();
        let mut acct = account(10_000);

        let first = adjuster.apply(&mut acct, t0()).unwrap();
        assert_eq!(first.risk_level, RiskLevel::Low);
        assert_eq!(first.new_credit_limit, Decimal::from(12_000));
        assert!(first.limit_change.is_some());

        let second = adjuster.apply(&mut acct, t0() + Duration::days(3)).unwrap();
        assert_eq!(second, first);
        assert_eq!(acct.credit_limit(), Decimal::from(12_000));
        assert_eq!(acct.ledger().limit_changes().len(), 1);
        assert_eq!(acct.ledger().risk_snapshots().len(), 1);
    }

    #[test]
    fn test_new_history_triggers_fresh_assessment() {
        let adjuster = LimitAdjuster::default();
        let mut acct = account(10_000);
        adjuster.apply(&mut acct, t0()).unwrap();

        acct.record_payment(PaymentRecord::missed(
            PaymentId::new("p1"),
            Decimal::from(100),
            t0() + Duration::days(1),
        ))
        .unwrap();

        let next = adjuster.apply(&mut acct, t0() + Duration::days(2)).unwrap();
        // one payment, recorded already settled
        assert_eq!(next.revision, 2);
        assert_eq!(acct.ledger().risk_snapshots().len(), 2);
        assert!(next.new_credit_limit < Decimal::from(12_000));
    }

    #[test]
    fn test_history_added_to_stored_snapshot_is_rescored() {
        let adjuster = LimitAdjuster::default();
        let mut acct = account(10_000);
        let due = t0() + Duration::days(30);
        acct.record_payment(PaymentRecord::pending(PaymentId::new("p1"), Decimal::from(100), due))
            .unwrap();
        acct.mark_paid(&PaymentId::new("p1"), due).unwrap();
        let first = adjuster.apply(&mut acct, due).unwrap();
        assert_eq!(first.factors.missed_payments, 1.0);

        // The persistence layer appends a missed installment to the stored JSON
        let mut stored = acct.snapshot();
        stored.payments.push(PaymentRecord::missed(
            PaymentId::new("p2"),
            Decimal::from(100),
            due + Duration::days(30),
        ));
        let mut reloaded = Account::restore(stored).unwrap();

        let next = adjuster
            .apply(&mut reloaded, due + Duration::days(31))
            .unwrap();
        assert_ne!(next.revision, first.revision);
        assert!((next.factors.missed_payments - 0.5).abs() < 1e-12);
        assert_eq!(reloaded.ledger().risk_snapshots().len(), 2);
    }

    #[test]
    fn test_huge_purchases_do_not_panic() {
        let adjuster = LimitAdjuster::default();
        let mut acct = account(credit_ledger::MAX_AMOUNT);
        for i in 0..3 {
            acct.record_transaction(credit_ledger::TransactionRecord::new(
                credit_ledger::TransactionId::new(format!("t{}", i)),
                Decimal::from(credit_ledger::MAX_AMOUNT),
                t0(),
                "Yacht Broker",
            ))
            .unwrap();
        }

        let assessment = adjuster.evaluate(&acct, t0());
        assert!(assessment.new_credit_limit <= acct.max_limit());
        assert!(assessment.new_credit_limit >= acct.min_limit());
    }

    #[test]
    fn test_evaluate_does_not_mutate() {
        let adjuster = LimitAdjuster::default();
        let acct = account(10_000);

        let preview = adjuster.evaluate(&acct, t0());
        assert_eq!(preview.new_credit_limit, Decimal::from(12_000));
        assert_eq!(acct.credit_limit(), Decimal::from(10_000));
        assert!(acct.ledger().risk_snapshots().is_empty());
    }

    #[test]
    fn test_reason_names_tier_move_and_weakest_factor() {
        let adjuster = LimitAdjuster::default();
        let mut acct = account(10_000);
        let assessment = adjuster.apply(&mut acct, t0()).unwrap();

        let reason = &assessment.limit_change.unwrap().reason;
        assert!(reason.starts_with("LOW risk tier"));
        assert!(reason.ends_with(": limit increased by 20.0%, weakest factor account age (0.50)"));
        assert_eq!(acct.ledger().limit_changes()[0].reason, *reason);
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = Metrics::new().unwrap();
        let adjuster = LimitAdjuster::default().with_metrics(metrics.clone());
        let mut acct = account(10_000);

        adjuster.apply(&mut acct, t0()).unwrap();
        adjuster.apply(&mut acct, t0()).unwrap();

        assert_eq!(metrics.assessments_total.get(), 1);
        assert_eq!(metrics.noops_total.get(), 1);
        assert_eq!(
            metrics.limit_changes_total.with_label_values(&["increase"]).get(),
            1
        );
    }
}

//! Append-only account history
//!
//! The ledger holds the four record streams that feed risk scoring:
//! installments, purchases, risk snapshots and limit changes. Records are
//! validated on the way in and never edited afterwards, with one exception:
//! a pending installment settles exactly once to `paid` or `missed`.
//!
//! # Revisions
//!
//! The revision is derived from the history itself: the number of payments,
//! plus the number of transactions, plus the number of settled (paid or
//! missed) payments. Every ingestion and every settlement raises it, and a
//! replayed history always lands on the same value, so it never has to be
//! persisted. Snapshots and limit changes are outputs of scoring and do not
//! count. A scoring pass stamps its outputs with the revision it read, so a
//! second pass over the same revision can be recognised as a no-op.

use crate::{
    types::{
        FactorScores, LimitChangeRecord, PaymentId, PaymentRecord, PaymentStatus, RiskSnapshot,
        SnapshotSource, TransactionId, TransactionRecord, MAX_AMOUNT,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Append-only history for one account
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    /// Installments in ingestion order
    payments: Vec<PaymentRecord>,

    /// Payment ID -> position in `payments`
    payment_index: HashMap<PaymentId, usize>,

    /// Purchases, oldest to newest
    transactions: Vec<TransactionRecord>,

    /// Seen transaction IDs
    transaction_ids: HashSet<TransactionId>,

    /// Limit changes, oldest to newest
    limit_changes: Vec<LimitChangeRecord>,

    /// Risk snapshots, oldest to newest
    risk_snapshots: Vec<RiskSnapshot>,

    /// Payments in a terminal status
    settled: u64,
}

impl HistoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an installment that has come due
    ///
    /// Returns the new ledger revision.
    pub fn record_payment(&mut self, record: PaymentRecord) -> Result<u64> {
        if let Err(e) = validate_payment(&record) {
            warn!(payment_id = %record.id, error = %e, "Rejected payment record");
            return Err(e);
        }

        if self.payment_index.contains_key(&record.id) {
            return Err(Error::DuplicateRecord(format!("payment {}", record.id)));
        }

        debug!(payment_id = %record.id, status = %record.status, "Recording payment");
        if record.status.is_terminal() {
            self.settled += 1;
        }
        self.payment_index.insert(record.id.clone(), self.payments.len());
        self.payments.push(record);
        Ok(self.revision())
    }

    /// Settle a pending installment as paid
    pub fn mark_paid(&mut self, id: &PaymentId, paid_date: DateTime<Utc>) -> Result<u64> {
        self.settle(id, PaymentStatus::Paid, Some(paid_date))
    }

    /// Settle a pending installment as missed
    pub fn mark_missed(&mut self, id: &PaymentId) -> Result<u64> {
        self.settle(id, PaymentStatus::Missed, None)
    }

    fn settle(
        &mut self,
        id: &PaymentId,
        status: PaymentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let position = *self
            .payment_index
            .get(id)
            .ok_or_else(|| Error::PaymentNotFound(id.to_string()))?;

        let payment = &mut self.payments[position];
        if payment.status.is_terminal() {
            return Err(Error::InvalidTransition(format!(
                "payment {} is already {}",
                id, payment.status
            )));
        }

        debug!(payment_id = %id, %status, "Settling payment");
        payment.status = status;
        payment.paid_date = paid_date;
        self.settled += 1;
        Ok(self.revision())
    }

    /// Record a purchase
    ///
    /// Purchases must arrive oldest to newest. Returns the new ledger revision.
    pub fn record_transaction(&mut self, record: TransactionRecord) -> Result<u64> {
        if let Err(e) = self.validate_transaction(&record) {
            warn!(transaction_id = %record.id, error = %e, "Rejected transaction record");
            return Err(e);
        }

        if !self.transaction_ids.insert(record.id.clone()) {
            return Err(Error::DuplicateRecord(format!("transaction {}", record.id)));
        }

        debug!(transaction_id = %record.id, amount = %record.amount, "Recording transaction");
        self.transactions.push(record);
        Ok(self.revision())
    }

    /// Append a risk score computed at the current revision
    pub fn append_risk_snapshot(
        &mut self,
        date: DateTime<Utc>,
        score: f64,
        source: SnapshotSource,
        factors: Option<FactorScores>,
    ) -> Result<&RiskSnapshot> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(Error::InvalidRecord(format!(
                "risk score {} outside [0, 1]",
                score
            )));
        }

        self.push_snapshot(RiskSnapshot {
            date,
            score,
            revision: self.revision(),
            source,
            factors,
        })
    }

    /// Append a limit change
    ///
    /// Changes form a chain: each `old_limit` must equal the previous
    /// `new_limit`. No-op changes are rejected, as are records whose `amount`
    /// or `percentage_change` disagree with their limits.
    pub fn append_limit_change(&mut self, record: LimitChangeRecord) -> Result<()> {
        if record.old_limit == record.new_limit {
            return Err(Error::InvalidRecord(
                "limit change must move the limit".to_string(),
            ));
        }

        if record.old_limit <= Decimal::ZERO || record.new_limit <= Decimal::ZERO {
            return Err(Error::InvalidRecord(
                "limits must be positive".to_string(),
            ));
        }

        if !record.is_consistent() {
            warn!(
                old_limit = %record.old_limit,
                new_limit = %record.new_limit,
                amount = %record.amount,
                "Rejected limit change record"
            );
            return Err(Error::InvalidRecord(format!(
                "limit change {} -> {} carries amount {} and percentage {}",
                record.old_limit, record.new_limit, record.amount, record.percentage_change
            )));
        }

        if let Some(last) = self.limit_changes.last() {
            if last.new_limit != record.old_limit {
                return Err(Error::InvariantViolation(format!(
                    "limit chain broken: previous new limit {} != old limit {}",
                    last.new_limit, record.old_limit
                )));
            }
            if record.revision < last.revision {
                return Err(Error::InvariantViolation(
                    "limit change revision went backwards".to_string(),
                ));
            }
        }

        if record.revision > self.revision() {
            return Err(Error::InvariantViolation(format!(
                "limit change revision {} ahead of ledger revision {}",
                record.revision,
                self.revision()
            )));
        }

        self.limit_changes.push(record);
        Ok(())
    }

    /// All installments, in ingestion order
    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    /// Look up an installment
    pub fn payment(&self, id: &PaymentId) -> Option<&PaymentRecord> {
        self.payment_index.get(id).map(|&i| &self.payments[i])
    }

    /// All purchases, oldest to newest
    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// All limit changes, oldest to newest
    pub fn limit_changes(&self) -> &[LimitChangeRecord] {
        &self.limit_changes
    }

    /// All risk snapshots, oldest to newest
    pub fn risk_snapshots(&self) -> &[RiskSnapshot] {
        &self.risk_snapshots
    }

    /// Most recent scorecard snapshot
    pub fn latest_scorecard(&self) -> Option<&RiskSnapshot> {
        self.risk_snapshots
            .iter()
            .rev()
            .find(|s| s.source == SnapshotSource::Scorecard)
    }

    /// Current history revision
    pub fn revision(&self) -> u64 {
        self.payments.len() as u64 + self.transactions.len() as u64 + self.settled
    }

    /// Sum of pending installment amounts
    pub fn outstanding_balance(&self) -> Decimal {
        self.payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending)
            .map(|p| p.amount)
            .sum()
    }

    /// Re-append a persisted snapshot, keeping its revision
    pub(crate) fn restore_snapshot(&mut self, snapshot: RiskSnapshot) -> Result<()> {
        if !snapshot.score.is_finite() || !(0.0..=1.0).contains(&snapshot.score) {
            return Err(Error::InvalidRecord(format!(
                "risk score {} outside [0, 1]",
                snapshot.score
            )));
        }
        if snapshot.revision > self.revision() {
            return Err(Error::InvariantViolation(format!(
                "snapshot revision {} ahead of ledger revision {}",
                snapshot.revision,
                self.revision()
            )));
        }
        self.push_snapshot(snapshot).map(|_| ())
    }

    fn push_snapshot(&mut self, snapshot: RiskSnapshot) -> Result<&RiskSnapshot> {
        if let Some(last) = self.risk_snapshots.last() {
            if snapshot.revision < last.revision {
                return Err(Error::InvariantViolation(
                    "risk snapshot revision went backwards".to_string(),
                ));
            }
        }
        self.risk_snapshots.push(snapshot);
        Ok(&self.risk_snapshots[self.risk_snapshots.len() - 1])
    }

    fn validate_transaction(&self, record: &TransactionRecord) -> Result<()> {
        if record.id.is_blank() {
            return Err(Error::InvalidRecord("transaction id is empty".to_string()));
        }

        if record.amount <= Decimal::ZERO || record.amount > Decimal::from(MAX_AMOUNT) {
            return Err(Error::InvalidRecord(format!(
                "transaction {} amount {} outside (0, {}]",
                record.id, record.amount, MAX_AMOUNT
            )));
        }

        if record.merchant.trim().is_empty() {
            return Err(Error::InvalidRecord(format!(
                "transaction {} has no merchant",
                record.id
            )));
        }

        if let Some(last) = self.transactions.last() {
            if record.date < last.date {
                return Err(Error::InvalidRecord(format!(
                    "transaction {} dated {} before previous transaction {}",
                    record.id, record.date, last.date
                )));
            }
        }

        Ok(())
    }
}

pub(crate) fn validate_payment(record: &PaymentRecord) -> Result<()> {
    if record.id.is_blank() {
        return Err(Error::InvalidRecord("payment id is empty".to_string()));
    }

    if record.amount <= Decimal::ZERO || record.amount > Decimal::from(MAX_AMOUNT) {
        return Err(Error::InvalidRecord(format!(
            "payment {} amount {} outside (0, {}]",
            record.id, record.amount, MAX_AMOUNT
        )));
    }

    match (record.status, record.paid_date) {
        (PaymentStatus::Paid, None) => Err(Error::InvalidRecord(format!(
            "payment {} is paid but has no paid date",
            record.id
        ))),
        (PaymentStatus::Pending | PaymentStatus::Missed, Some(_)) => {
            Err(Error::InvalidRecord(format!(
                "payment {} is {} but has a paid date",
                record.id, record.status
            )))
        }
        _ => Ok(()),
    }
}

//! Account aggregate
//!
//! An [`Account`] owns the credit limits and the [`HistoryLedger`]. History
//! enters through the record/settle methods; the credit limit moves only
//! through [`Account::apply_limit_change`], which keeps the limit inside
//! `[min_limit, max_limit]` and the change chain unbroken.

use crate::{
    ledger::{validate_payment, HistoryLedger},
    plan::InstallmentPlan,
    types::{
        AccountId, FactorScores, LimitChangeRecord, PaymentId, PaymentRecord, RiskSnapshot,
        SnapshotSource, TransactionId, TransactionRecord, MAX_AMOUNT,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Credit line account
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    initial_credit_limit: Decimal,
    credit_limit: Decimal,
    opened_at: DateTime<Utc>,
    ledger: HistoryLedger,
}

impl Account {
    /// Open an account at its initial limit
    ///
    /// The initial limit must be a positive whole amount no larger than
    /// [`MAX_AMOUNT`].
    pub fn open(
        id: AccountId,
        initial_credit_limit: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Result<Self> {
        if id.is_blank() {
            return Err(Error::InvalidRecord("account id is empty".to_string()));
        }

        if initial_credit_limit <= Decimal::ZERO
            || initial_credit_limit > Decimal::from(MAX_AMOUNT)
            || !initial_credit_limit.fract().is_zero()
        {
            return Err(Error::InvalidRecord(format!(
                "initial credit limit {} must be a whole amount in [1, {}]",
                initial_credit_limit, MAX_AMOUNT
            )));
        }

        Ok(Self {
            id,
            initial_credit_limit: initial_credit_limit.normalize(),
            credit_limit: initial_credit_limit.normalize(),
            opened_at,
            ledger: HistoryLedger::new(),
        })
    }

    /// Account ID
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Current credit limit
    pub fn credit_limit(&self) -> Decimal {
        self.credit_limit
    }

    /// Limit at account opening
    pub fn initial_credit_limit(&self) -> Decimal {
        self.initial_credit_limit
    }

    /// Lowest permitted limit: `ceil(initial × 0.5)`
    pub fn min_limit(&self) -> Decimal {
        (self.initial_credit_limit * Decimal::new(5, 1)).ceil()
    }

    /// Highest permitted limit: `initial × 2`
    pub fn max_limit(&self) -> Decimal {
        self.initial_credit_limit * Decimal::TWO
    }

    /// Clamp a candidate limit into `[min_limit, max_limit]`
    pub fn clamp_limit(&self, limit: Decimal) -> Decimal {
        limit.max(self.min_limit()).min(self.max_limit())
    }

    /// Opening timestamp
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Read-only history
    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Credit not yet committed to pending installments
    pub fn available_credit(&self) -> Decimal {
        (self.credit_limit - self.ledger.outstanding_balance()).max(Decimal::ZERO)
    }

    /// Record an installment that has come due
    pub fn record_payment(&mut self, record: PaymentRecord) -> Result<u64> {
        self.ledger.record_payment(record)
    }

    /// Record a purchase
    pub fn record_transaction(&mut self, record: TransactionRecord) -> Result<u64> {
        self.ledger.record_transaction(record)
    }

    /// Buy on an installment plan
    ///
    /// Records the purchase under a freshly generated ID together with its
    /// pending installments. Either everything is recorded or nothing is.
    pub fn checkout(
        &mut self,
        plan: &InstallmentPlan,
        price: Decimal,
        merchant: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<TransactionId> {
        let id = TransactionId::generate();
        let installments = plan.schedule(&id, price, at)?;
        for installment in &installments {
            validate_payment(installment)
                .map_err(|e| Error::InvalidPlan(format!("installment rejected: {}", e)))?;
        }

        self.ledger
            .record_transaction(TransactionRecord::new(id.clone(), price, at, merchant))?;
        for installment in installments {
            self.ledger.record_payment(installment)?;
        }

        info!(
            account_id = %self.id,
            transaction_id = %id,
            price = %price,
            months = plan.months,
            "Checkout recorded"
        );
        Ok(id)
    }

    /// Settle a pending installment as paid
    pub fn mark_paid(&mut self, id: &PaymentId, paid_date: DateTime<Utc>) -> Result<u64> {
        self.ledger.mark_paid(id, paid_date)
    }

    /// Settle a pending installment as missed
    pub fn mark_missed(&mut self, id: &PaymentId) -> Result<u64> {
        self.ledger.mark_missed(id)
    }

    /// Append a risk snapshot at the current revision
    pub fn append_risk_snapshot(
        &mut self,
        date: DateTime<Utc>,
        score: f64,
        source: SnapshotSource,
        factors: Option<FactorScores>,
    ) -> Result<&RiskSnapshot> {
        self.ledger.append_risk_snapshot(date, score, source, factors)
    }

    /// Move the credit limit
    ///
    /// The record must start from the current limit and land inside the
    /// account's bounds.
    pub fn apply_limit_change(&mut self, record: LimitChangeRecord) -> Result<()> {
        if record.old_limit != self.credit_limit {
            return Err(Error::InvariantViolation(format!(
                "limit change starts at {} but current limit is {}",
                record.old_limit, self.credit_limit
            )));
        }

        if record.new_limit < self.min_limit() || record.new_limit > self.max_limit() {
            return Err(Error::InvariantViolation(format!(
                "new limit {} outside [{}, {}]",
                record.new_limit,
                self.min_limit(),
                self.max_limit()
            )));
        }

        let new_limit = record.new_limit;
        self.ledger.append_limit_change(record)?;

        info!(
            account_id = %self.id,
            old_limit = %self.credit_limit,
            new_limit = %new_limit,
            "Credit limit changed"
        );
        self.credit_limit = new_limit;
        Ok(())
    }

    /// Capture the persisted form of this account
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id.clone(),
            initial_credit_limit: self.initial_credit_limit,
            credit_limit: self.credit_limit,
            opened_at: self.opened_at,
            payments: self.ledger.payments().to_vec(),
            transactions: self.ledger.transactions().to_vec(),
            limit_changes: self.ledger.limit_changes().to_vec(),
            risk_snapshots: self.ledger.risk_snapshots().to_vec(),
        }
    }

    /// Rebuild an account by replaying a snapshot through validation
    ///
    /// The ledger revision is recomputed from the replayed records, so
    /// history added to a stored snapshot is always seen as new.
    pub fn restore(snapshot: AccountSnapshot) -> Result<Self> {
        let mut account = Account::open(
            snapshot.id,
            snapshot.initial_credit_limit,
            snapshot.opened_at,
        )?;

        for payment in snapshot.payments {
            account.ledger.record_payment(payment)?;
        }
        for transaction in snapshot.transactions {
            account.ledger.record_transaction(transaction)?;
        }

        for change in snapshot.limit_changes {
            account.apply_limit_change(change)?;
        }
        for risk in snapshot.risk_snapshots {
            account.ledger.restore_snapshot(risk)?;
        }

        if account.credit_limit != snapshot.credit_limit.normalize() {
            return Err(Error::InvariantViolation(format!(
                "stored credit limit {} does not match limit history {}",
                snapshot.credit_limit, account.credit_limit
            )));
        }

        Ok(account)
    }

    /// Parse and restore from JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        let snapshot: AccountSnapshot = serde_json::from_str(raw)?;
        Self::restore(snapshot)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

/// Persisted form of an [`Account`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Account ID
    pub id: AccountId,

    /// Limit at account opening
    pub initial_credit_limit: Decimal,

    /// Current credit limit
    pub credit_limit: Decimal,

    /// Opening timestamp
    pub opened_at: DateTime<Utc>,

    /// Installments
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,

    /// Purchases, oldest to newest
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,

    /// Limit changes, oldest to newest
    #[serde(default)]
    pub limit_changes: Vec<LimitChangeRecord>,

    /// Risk snapshots, oldest to newest
    #[serde(default)]
    pub risk_snapshots: Vec<RiskSnapshot>,
}

//! Core types for the ledger
//!
//! All types are designed for:
//! - Lossless JSON round-trips (camelCase field names on the wire)
//! - Exact arithmetic (Decimal for money)
//! - Explicit timestamps (no record reads the wall clock)

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Largest amount, price or credit limit accepted, in whole currency units
///
/// Keeps every sum the ledger and scorer compute far inside `Decimal` range.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Tolerance when re-checking a stored percentage against its limits
const PERCENTAGE_TOLERANCE: f64 = 1e-6;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create new ID
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh time-ordered ID (UUIDv7)
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Get as string
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True if the ID is empty or whitespace
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Account identifier (customer or card account)
    AccountId
);

string_id!(
    /// Payment (installment) identifier
    PaymentId
);

string_id!(
    /// Transaction identifier, as issued by the transaction provider
    TransactionId
);

/// Installment payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Due, not yet settled
    Pending,
    /// Paid (terminal)
    Paid,
    /// Missed (terminal)
    Missed,
}

impl PaymentStatus {
    /// Check if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Missed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Missed => "missed",
        };
        f.write_str(s)
    }
}

/// A single installment that has come due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Payment ID
    pub id: PaymentId,

    /// Installment amount
    pub amount: Decimal,

    /// Due date
    pub due_date: DateTime<Utc>,

    /// Settlement date (only for paid installments)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,

    /// Current status
    pub status: PaymentStatus,
}

impl PaymentRecord {
    /// Create a pending installment
    pub fn pending(id: PaymentId, amount: Decimal, due_date: DateTime<Utc>) -> Self {
        Self {
            id,
            amount,
            due_date,
            paid_date: None,
            status: PaymentStatus::Pending,
        }
    }

    /// Create an installment paid at `paid_date`
    pub fn paid(
        id: PaymentId,
        amount: Decimal,
        due_date: DateTime<Utc>,
        paid_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            due_date,
            paid_date: Some(paid_date),
            status: PaymentStatus::Paid,
        }
    }

    /// Create a missed installment
    pub fn missed(id: PaymentId, amount: Decimal, due_date: DateTime<Utc>) -> Self {
        Self {
            id,
            amount,
            due_date,
            paid_date: None,
            status: PaymentStatus::Missed,
        }
    }

    /// Paid on or before the due date
    pub fn is_on_time(&self) -> bool {
        self.status == PaymentStatus::Paid
            && self.paid_date.map_or(false, |paid| paid <= self.due_date)
    }
}

/// A purchase on the credit line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction ID
    pub id: TransactionId,

    /// Purchase amount
    pub amount: Decimal,

    /// Purchase date
    pub date: DateTime<Utc>,

    /// Merchant name
    pub merchant: String,
}

impl TransactionRecord {
    /// Create new transaction record
    pub fn new(
        id: TransactionId,
        amount: Decimal,
        date: DateTime<Utc>,
        merchant: impl Into<String>,
    ) -> Self {
        Self {
            id,
            amount,
            date,
            merchant: merchant.into(),
        }
    }
}

/// Credit limit change, appended whenever the limit moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitChangeRecord {
    /// When the change was applied
    pub date: DateTime<Utc>,

    /// Limit before the change
    pub old_limit: Decimal,

    /// Limit after the change
    pub new_limit: Decimal,

    /// Signed change (`new_limit - old_limit`)
    pub amount: Decimal,

    /// Signed change as a percentage of `old_limit`
    pub percentage_change: f64,

    /// Human-readable reason
    pub reason: String,

    /// Ledger revision the change was computed against
    pub revision: u64,
}

impl LimitChangeRecord {
    /// Create a change record, deriving the signed amount and percentage
    pub fn new(
        date: DateTime<Utc>,
        old_limit: Decimal,
        new_limit: Decimal,
        reason: impl Into<String>,
        revision: u64,
    ) -> Self {
        let amount = new_limit - old_limit;

        Self {
            date,
            old_limit,
            new_limit,
            amount,
            percentage_change: percentage_of(amount, old_limit),
            reason: reason.into(),
            revision,
        }
    }

    /// `amount` and `percentage_change` agree with the two limits
    pub fn is_consistent(&self) -> bool {
        self.new_limit
            .checked_sub(self.old_limit)
            .is_some_and(|expected| {
                self.amount == expected
                    && self.percentage_change.is_finite()
                    && (self.percentage_change - percentage_of(expected, self.old_limit)).abs()
                        <= PERCENTAGE_TOLERANCE
            })
    }

    /// True if the change raised the limit
    pub fn is_increase(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

fn percentage_of(amount: Decimal, base: Decimal) -> f64 {
    if base.is_zero() {
        return 0.0;
    }
    amount
        .checked_div(base)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|pct| pct.to_f64())
        .unwrap_or(f64::INFINITY)
}

/// The five scorecard sub-scores, each in `[0, 1]` (higher = lower risk)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScores {
    /// Share of installments not missed
    pub missed_payments: f64,
    /// Share of installments paid on time
    pub payment_history: f64,
    /// Volatility and frequency of recent purchases
    pub transaction_patterns: f64,
    /// Spend relative to the credit limit
    pub credit_utilization: f64,
    /// Time since the first purchase
    pub account_age: f64,
}

/// Where a risk snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Applicant profile at account opening
    Onboarding,
    /// Scorecard run over the account history
    Scorecard,
}

/// Risk score recorded after a scoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSnapshot {
    /// When the score was computed
    pub date: DateTime<Utc>,

    /// Risk score in `[0, 1]`
    pub score: f64,

    /// Ledger revision the score was computed against
    pub revision: u64,

    /// Origin of the score
    pub source: SnapshotSource,

    /// Sub-score breakdown (scorecard runs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factors: Option<FactorScores>,
}

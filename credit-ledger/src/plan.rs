//! Installment plans
//!
//! Splits a purchase into monthly installments. Each installment becomes a
//! pending [`PaymentRecord`] that the caller records when it comes due.

use crate::{
    types::{PaymentId, PaymentRecord, TransactionId, MAX_AMOUNT},
    Error, Result,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Days between installments
const INSTALLMENT_INTERVAL_DAYS: i64 = 30;

/// Longest plan offered
pub const MAX_PLAN_MONTHS: u32 = 60;

/// Installment plan terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPlan {
    /// Number of monthly installments
    pub months: u32,

    /// Annual interest rate as a fraction (0.05 = 5%)
    pub annual_interest_rate: Decimal,
}

impl InstallmentPlan {
    /// Create plan terms
    pub fn new(months: u32, annual_interest_rate: Decimal) -> Result<Self> {
        let plan = Self {
            months,
            annual_interest_rate,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Standard checkout offers: 3 months interest-free, 6 at 5%, 12 at 8%
    pub fn presets() -> [InstallmentPlan; 3] {
        [
            Self {
                months: 3,
                annual_interest_rate: Decimal::ZERO,
            },
            Self {
                months: 6,
                annual_interest_rate: Decimal::new(5, 2),
            },
            Self {
                months: 12,
                annual_interest_rate: Decimal::new(8, 2),
            },
        ]
    }

    fn validate(&self) -> Result<()> {
        if self.months == 0 || self.months > MAX_PLAN_MONTHS {
            return Err(Error::InvalidPlan(format!(
                "plan length {} outside 1-{} months",
                self.months, MAX_PLAN_MONTHS
            )));
        }
        if self.annual_interest_rate < Decimal::ZERO {
            return Err(Error::InvalidPlan(format!(
                "negative interest rate {}",
                self.annual_interest_rate
            )));
        }
        Ok(())
    }

    /// Monthly installment for `price`, rounded to cents
    ///
    /// Interest-free plans split the price evenly; otherwise the standard
    /// amortized payment `P·r·(1+r)^n / ((1+r)^n − 1)` with `r = rate / 12`.
    pub fn monthly_payment(&self, price: Decimal) -> Result<Decimal> {
        self.validate()?;
        if price <= Decimal::ZERO || price > Decimal::from(MAX_AMOUNT) {
            return Err(Error::InvalidPlan(format!(
                "price {} outside (0, {}]",
                price, MAX_AMOUNT
            )));
        }

        let n = Decimal::from(self.months);
        let payment = if self.annual_interest_rate.is_zero() {
            Some(price / n)
        } else {
            let r = self.annual_interest_rate / Decimal::from(12);
            let step = Decimal::ONE + r;
            (0..self.months)
                .try_fold(Decimal::ONE, |acc, _| acc.checked_mul(step))
                .and_then(|growth| {
                    price
                        .checked_mul(r)?
                        .checked_mul(growth)?
                        .checked_div(growth - Decimal::ONE)
                })
        };

        payment
            .map(|p| p.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
            .ok_or_else(|| Error::InvalidPlan(self.overflow_message(price)))
    }

    /// Total repaid over the plan
    pub fn total_cost(&self, price: Decimal) -> Result<Decimal> {
        self.monthly_payment(price)?
            .checked_mul(Decimal::from(self.months))
            .ok_or_else(|| Error::InvalidPlan(self.overflow_message(price)))
    }

    fn overflow_message(&self, price: Decimal) -> String {
        format!(
            "{} months at {} overflows for price {}",
            self.months, self.annual_interest_rate, price
        )
    }

    /// Pending installments for a purchase made at `start`
    ///
    /// The first installment falls due 30 days after `start`, then every 30
    /// days. IDs are `"{purchase_id}-{k}"` with `k` starting at 1.
    pub fn schedule(
        &self,
        purchase_id: &TransactionId,
        price: Decimal,
        start: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>> {
        let installment = self.monthly_payment(price)?;

        Ok((1..=self.months)
            .map(|k| {
                PaymentRecord::pending(
                    PaymentId::new(format!("{}-{}", purchase_id, k)),
                    installment,
                    start + Duration::days(INSTALLMENT_INTERVAL_DAYS * i64::from(k)),
                )
            })
            .collect())
    }
}

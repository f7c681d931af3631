//! Pre-purchase affordability checks
//!
//! Flags over-spending before a new installment plan is opened: BNPL debt
//! against monthly income, the number of open plans, remaining credit, and
//! the account's current risk tier.

use crate::{config::AffordabilityConfig, Assessment, Error, Result, RiskLevel};
use credit_ledger::Account;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Warning severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth surfacing
    Medium,
    /// Likely to cause missed payments
    High,
}

/// What the warning is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Existing BNPL debt already above the income ratio
    HighDebtRatio,
    /// Too many plans open at once
    TooManyPlans,
    /// This purchase would push debt above the income ratio
    PurchaseExceedsDebtRatio,
    /// Purchase larger than the unused credit line
    ExceedsAvailableCredit,
    /// Account sits in the CRITICAL tier
    HighRiskAccount,
}

impl WarningKind {
    /// Whether the warning stops the purchase
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            WarningKind::ExceedsAvailableCredit | WarningKind::HighRiskAccount
        )
    }
}

/// One affordability warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    /// Warning kind
    pub kind: WarningKind,
    /// Severity
    pub severity: Severity,
    /// Customer-facing message
    pub message: String,
}

/// Result of a pre-purchase check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCheck {
    /// No blocking warning was raised
    pub can_proceed: bool,

    /// All warnings raised
    pub warnings: Vec<Warning>,

    /// Open BNPL debt / monthly income
    pub debt_to_income_ratio: f64,

    /// (Open BNPL debt + purchase) / monthly income
    pub new_debt_to_income_ratio: f64,

    /// Credit limit minus open BNPL debt
    pub available_credit: Decimal,
}

/// Affordability checker
#[derive(Debug, Clone, Default)]
pub struct AffordabilityChecker {
    config: AffordabilityConfig,
}

impl AffordabilityChecker {
    /// Create new checker
    pub fn new(config: AffordabilityConfig) -> Self {
        Self { config }
    }

    /// Check a purchase against income, open plans and the latest assessment
    ///
    /// `open_plan_balances` holds the remaining balance of each open plan.
    pub fn check(
        &self,
        account: &Account,
        open_plan_balances: &[Decimal],
        annual_income: Decimal,
        purchase_amount: Decimal,
        assessment: &Assessment,
    ) -> Result<PurchaseCheck> {
        if purchase_amount <= Decimal::ZERO {
            return Err(Error::InvalidPurchase(format!(
                "purchase amount {} must be positive",
                purchase_amount
            )));
        }
        if assessment.account_id != *account.id() {
            return Err(Error::InvalidPurchase(format!(
                "assessment is for account {}, not {}",
                assessment.account_id,
                account.id()
            )));
        }

        if let Some(balance) = open_plan_balances.iter().find(|b| **b < Decimal::ZERO) {
            return Err(Error::InvalidPurchase(format!(
                "open plan balance {} is negative",
                balance
            )));
        }
        let debt = open_plan_balances
            .iter()
            .try_fold(Decimal::ZERO, |total, b| total.checked_add(*b))
            .ok_or_else(|| Error::InvalidPurchase("open plan balances overflow".to_string()))?;
        let new_debt = debt.checked_add(purchase_amount).ok_or_else(|| {
            Error::InvalidPurchase(format!("purchase amount {} overflows", purchase_amount))
        })?;

        let monthly_income = annual_income / Decimal::from(12);
        let debt_ratio = ratio(debt, monthly_income);
        let new_debt_ratio = ratio(new_debt, monthly_income);
        let available_credit = (account.credit_limit() - debt).max(Decimal::ZERO);
        let max_ratio = self.config.max_debt_to_income;

        let mut warnings = Vec::new();

        if debt_ratio > max_ratio {
            warnings.push(Warning {
                kind: WarningKind::HighDebtRatio,
                severity: Severity::High,
                message: format!(
                    "Your total BNPL debt (${:.2}) exceeds {:.0}% of your monthly income.",
                    debt,
                    max_ratio * 100.0
                ),
            });
        }

        if open_plan_balances.len() >= self.config.max_open_plans {
            warnings.push(Warning {
                kind: WarningKind::TooManyPlans,
                severity: Severity::Medium,
                message: format!(
                    "You currently have {} active payment plans.",
                    open_plan_balances.len()
                ),
            });
        }

        if new_debt_ratio > max_ratio {
            warnings.push(Warning {
                kind: WarningKind::PurchaseExceedsDebtRatio,
                severity: Severity::High,
                message: format!(
                    "This purchase would raise your debt-to-income ratio to {:.1}%.",
                    new_debt_ratio * 100.0
                ),
            });
        }

        if purchase_amount > available_credit {
            warnings.push(Warning {
                kind: WarningKind::ExceedsAvailableCredit,
                severity: Severity::High,
                message: format!(
                    "This purchase (${:.2}) exceeds your available credit (${:.2}).",
                    purchase_amount, available_credit
                ),
            });
        }

        if assessment.risk_level == RiskLevel::Critical {
            warnings.push(Warning {
                kind: WarningKind::HighRiskAccount,
                severity: Severity::High,
                message: "Your payment history carries a high risk of missed payments."
                    .to_string(),
            });
        }

        let can_proceed = !warnings.iter().any(|w| w.kind.is_blocking());

        debug!(
            account_id = %account.id(),
            purchase = %purchase_amount,
            warnings = warnings.len(),
            can_proceed,
            "Affordability check"
        );

        Ok(PurchaseCheck {
            can_proceed,
            warnings,
            debt_to_income_ratio: debt_ratio,
            new_debt_to_income_ratio: new_debt_ratio,
            available_credit,
        })
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> f64 {
    if denominator <= Decimal::ZERO {
        return if numerator > Decimal::ZERO { f64::INFINITY } else { 0.0 };
    }
    numerator
        .checked_div(denominator)
        .and_then(|r| r.to_f64())
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LimitAdjuster;
    use chrono::{TimeZone, Utc};
    use credit_ledger::{AccountId, PaymentId, PaymentRecord};

    fn setup(limit: i64) -> (Account, Assessment) {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let account = Account::open(AccountId::new("shopper"), Decimal::from(limit), at).unwrap();
        let assessment = LimitAdjuster::default().evaluate(&account, at);
        (account, assessment)
    }

    fn kinds(check: &PurchaseCheck) -> Vec<WarningKind> {
        check.warnings.iter().map(|w| w.kind).collect()
    }

    #[test]
    fn test_clean_purchase() {
        let (account, assessment) = setup(5_000);
        let check = AffordabilityChecker::default()
            .check(&account, &[Decimal::from(200)], Decimal::from(60_000), Decimal::from(300), &assessment)
            .unwrap();

        assert!(check.can_proceed);
        assert!(check.warnings.is_empty());
        assert!((check.debt_to_income_ratio - 0.04).abs() < 1e-9);
        assert_eq!(check.available_credit, Decimal::from(4_800));
    }

    #[test]
    fn test_debt_ratio_warnings_do_not_block() {
        let (account, assessment) = setup(10_000);
        // monthly income 2000; debt 900 (45%); +300 -> 60%
        let balances = vec![Decimal::from(300); 3];
        let check = AffordabilityChecker::default()
            .check(&account, &balances, Decimal::from(24_000), Decimal::from(300), &assessment)
            .unwrap();

        assert_eq!(
            kinds(&check),
            vec![WarningKind::HighDebtRatio, WarningKind::PurchaseExceedsDebtRatio]
        );
        assert!(check.can_proceed);
    }

    #[test]
    fn test_too_many_plans() {
        let (account, assessment) = setup(10_000);
        let balances = vec![Decimal::from(10); 5];
        let check = AffordabilityChecker::default()
            .check(&account, &balances, Decimal::from(120_000), Decimal::from(10), &assessment)
            .unwrap();
        assert_eq!(kinds(&check), vec![WarningKind::TooManyPlans]);
        assert_eq!(check.warnings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_exceeds_available_credit_blocks() {
        let (account, assessment) = setup(1_000);
        let check = AffordabilityChecker::default()
            .check(&account, &[Decimal::from(800)], Decimal::from(500_000), Decimal::from(300), &assessment)
            .unwrap();
        assert!(!check.can_proceed);
        assert_eq!(kinds(&check), vec![WarningKind::ExceedsAvailableCredit]);
    }

    #[test]
    fn test_critical_account_blocked() {
        let (mut account, _) = setup(10_000);
        let at = account.opened_at();
        for i in 0..4 {
            account
                .record_payment(PaymentRecord::missed(PaymentId::new(format!("m{}", i)), Decimal::from(50), at))
                .unwrap();
        }
        account
            .record_transaction(credit_ledger::TransactionRecord::new(
                credit_ledger::TransactionId::new("big"),
                Decimal::from(9_500),
                at,
                "Electronics",
            ))
            .unwrap();
        // 0 + 0 + 0.2 × 0.75 + 0.15 × 0.2 + 0.15 × 0.5 = 0.255
        let assessment = LimitAdjuster::default().evaluate(&account, at);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);

        let check = AffordabilityChecker::default()
            .check(&account, &[], Decimal::from(80_000), Decimal::from(20), &assessment)
            .unwrap();
        assert!(!check.can_proceed);
        assert!(kinds(&check).contains(&WarningKind::HighRiskAccount));
    }

    #[test]
    fn test_zero_income() {
        let (account, assessment) = setup(1_000);
        let check = AffordabilityChecker::default()
            .check(&account, &[], Decimal::ZERO, Decimal::from(10), &assessment)
            .unwrap();
        assert!(check.new_debt_to_income_ratio.is_infinite());
        assert_eq!(check.debt_to_income_ratio, 0.0);
        assert!(kinds(&check).contains(&WarningKind::PurchaseExceedsDebtRatio));
    }

    #[test]
    fn test_invalid_purchase() {
        let (account, assessment) = setup(1_000);
        let checker = AffordabilityChecker::default();
        assert!(checker
            .check(&account, &[], Decimal::from(1_000), Decimal::ZERO, &assessment)
            .is_err());

        let other =
            Account::open(AccountId::new("someone-else"), Decimal::from(1_000), account.opened_at()).unwrap();
        assert!(checker
            .check(&other, &[], Decimal::from(1_000), Decimal::from(5), &assessment)
            .is_err());
    }

    #[test]
    fn test_extreme_balances_rejected_not_panicking() {
        let (account, assessment) = setup(1_000);
        let checker = AffordabilityChecker::default();

        let huge = vec![Decimal::MAX, Decimal::MAX];
        assert!(matches!(
            checker.check(&account, &huge, Decimal::from(1_000), Decimal::from(5), &assessment),
            Err(Error::InvalidPurchase(_))
        ));
        assert!(matches!(
            checker.check(&account, &[Decimal::MAX], Decimal::from(1_000), Decimal::MAX, &assessment),
            Err(Error::InvalidPurchase(_))
        ));
        assert!(matches!(
            checker.check(&account, &[Decimal::from(-10)], Decimal::from(1_000), Decimal::from(5), &assessment),
            Err(Error::InvalidPurchase(_))
        ));

        // Tiny income against a huge balance saturates instead of overflowing
        let check = checker
            .check(&account, &[Decimal::MAX / Decimal::TWO], Decimal::ONE, Decimal::ONE, &assessment)
            .unwrap();
        assert!(check.debt_to_income_ratio.is_infinite());
        assert!(!check.can_proceed);
    }

    #[test]
    fn test_available_credit_from_plan_balances() {
        // Ledger installments are not counted on top of the plan balances
        let (mut account, assessment) = setup(1_000);
        account
            .record_payment(PaymentRecord::pending(PaymentId::new("i1"), Decimal::from(100), account.opened_at()))
            .unwrap();
        let check = AffordabilityChecker::default()
            .check(&account, &[Decimal::from(300)], Decimal::from(100_000), Decimal::from(50), &assessment)
            .unwrap();
        assert_eq!(check.available_credit, Decimal::from(700));
    }
}

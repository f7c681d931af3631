//! Account opening
//!
//! Derives the starting credit limit and an initial risk score from the
//! applicant's profile, before any payment or purchase history exists.

use crate::{Error, Result, RiskScore};
use chrono::{DateTime, Utc};
use credit_ledger::{Account, AccountId, SnapshotSource, MAX_AMOUNT};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Applicant financial profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantProfile {
    /// Gross annual income
    pub annual_income: Decimal,

    /// Bureau credit score (300-850)
    pub credit_score: u16,

    /// Years with current employer
    pub employment_years: f64,

    /// Existing debt payments as a share of income
    pub debt_to_income_ratio: f64,
}

impl ApplicantProfile {
    /// Reject impossible values
    pub fn validate(&self) -> Result<()> {
        if self.annual_income < Decimal::ZERO {
            return Err(Error::InvalidProfile("annual income is negative".to_string()));
        }

        if !(300..=850).contains(&self.credit_score) {
            return Err(Error::InvalidProfile(format!(
                "credit score {} outside 300-850",
                self.credit_score
            )));
        }

        if !self.employment_years.is_finite() || self.employment_years < 0.0 {
            return Err(Error::InvalidProfile(
                "employment years must be a non-negative number".to_string(),
            ));
        }

        if !self.debt_to_income_ratio.is_finite() || self.debt_to_income_ratio < 0.0 {
            return Err(Error::InvalidProfile(
                "debt-to-income ratio must be a non-negative number".to_string(),
            ));
        }

        Ok(())
    }
}

/// Starting limit: 20% of income scaled by credit score, tenure and debt load
pub fn initial_credit_limit(profile: &ApplicantProfile) -> Result<Decimal> {
    profile.validate()?;

    let mut limit = profile.annual_income * Decimal::new(2, 1);

    if profile.credit_score >= 750 {
        limit *= Decimal::new(15, 1);
    } else if profile.credit_score >= 700 {
        limit *= Decimal::new(12, 1);
    } else if profile.credit_score < 600 {
        limit *= Decimal::new(5, 1);
    }

    if profile.employment_years >= 5.0 {
        limit *= Decimal::new(12, 1);
    } else if profile.employment_years < 1.0 {
        limit *= Decimal::new(7, 1);
    }

    if profile.debt_to_income_ratio > 0.4 {
        limit *= Decimal::new(8, 1);
    }

    let limit = limit.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Ok(limit
        .max(Decimal::ONE)
        .min(Decimal::from(MAX_AMOUNT))
        .normalize())
}

/// Profile-based score in `[0, 1]`, higher meaning lower risk
pub fn initial_risk_score(profile: &ApplicantProfile) -> Result<RiskScore> {
    profile.validate()?;

    let mut risk = 0.0;

    risk += match profile.credit_score {
        s if s < 580 => 0.3,
        s if s < 670 => 0.2,
        s if s < 740 => 0.1,
        _ => 0.0,
    };

    let income = profile.annual_income;
    risk += if income < Decimal::from(30_000) {
        0.25
    } else if income < Decimal::from(50_000) {
        0.15
    } else if income < Decimal::from(75_000) {
        0.05
    } else {
        0.0
    };

    risk += match profile.employment_years {
        y if y < 1.0 => 0.15,
        y if y < 3.0 => 0.1,
        y if y < 5.0 => 0.05,
        _ => 0.0,
    };

    risk += match profile.debt_to_income_ratio {
        d if d > 0.5 => 0.3,
        d if d > 0.4 => 0.2,
        d if d > 0.3 => 0.1,
        _ => 0.0,
    };

    Ok(RiskScore::new(1.0 - f64::min(risk, 1.0)))
}

/// Open an account sized from the profile, with its initial risk snapshot
pub fn open_account(
    id: AccountId,
    profile: &ApplicantProfile,
    as_of: DateTime<Utc>,
) -> Result<Account> {
    let limit = initial_credit_limit(profile)?;
    let score = initial_risk_score(profile)?;

    let mut account = Account::open(id, limit, as_of)?;
    account.append_risk_snapshot(as_of, score.value(), SnapshotSource::Onboarding, None)?;

    info!(
        account_id = %account.id(),
        credit_limit = %limit,
        risk_score = %score,
        "Account opened"
    );
    Ok(account)
}

//! Scorecard factors
//!
//! Pure functions over an account's history. Each returns a value in
//! `[0, 1]` where higher means lower risk, and each has a fixed value for an
//! empty history. `as_of` stands in for "now"; nothing here reads the clock.

use crate::config::{BandTable, FactorConfig};
use chrono::{DateTime, Utc};
use credit_ledger::{Account, FactorScores, PaymentRecord, PaymentStatus, TransactionRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Account age score when there are no purchases
pub const NEUTRAL_AGE_SCORE: f64 = 0.5;

/// `1 − missed / total`; 1 with no payments
pub fn missed_payments_score(payments: &[PaymentRecord]) -> f64 {
    if payments.is_empty() {
        return 1.0;
    }

    let missed = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Missed)
        .count();
    1.0 - missed as f64 / payments.len() as f64
}

/// Share of payments paid on or before their due date; 1 with no payments
pub fn payment_history_score(payments: &[PaymentRecord]) -> f64 {
    if payments.is_empty() {
        return 1.0;
    }

    let on_time = payments.iter().filter(|p| p.is_on_time()).count();
    on_time as f64 / payments.len() as f64
}

/// Volatility and frequency of the last `window` purchases; 1 with none
///
/// Volatility is `(max − min) / average`, scored `1 − (v − 1) / 2`. Frequency
/// is purchases per day since the earliest sampled purchase, scored
/// `frequency / 2`. Both are clamped to `[0, 1]` and averaged.
pub fn transaction_patterns_score(
    transactions: &[TransactionRecord],
    window: usize,
    as_of: DateTime<Utc>,
) -> f64 {
    if transactions.is_empty() {
        return 1.0;
    }

    let start = transactions.len().saturating_sub(window.max(1));
    let sample = &transactions[start..];

    let amounts: Vec<f64> = sample.iter().map(|t| to_f64(t.amount)).collect();
    let count = amounts.len() as f64;
    let average = amounts.iter().sum::<f64>() / count;
    let max = amounts.iter().copied().fold(f64::MIN, f64::max);
    let min = amounts.iter().copied().fold(f64::MAX, f64::min);

    let volatility = if average > 0.0 {
        (max - min) / average
    } else {
        0.0
    };

    let earliest = sample.iter().map(|t| t.date).min().unwrap_or(as_of);
    let mut days = days_between(earliest, as_of);
    if days <= 0.0 {
        days = 1.0;
    }
    let frequency = count / days;

    let volatility_score = clamp_unit(1.0 - (volatility - 1.0) / 2.0);
    let frequency_score = clamp_unit(frequency / 2.0);

    (volatility_score + frequency_score) / 2.0
}

/// Total spend against the credit limit, bucketed; 1 with no purchases
pub fn credit_utilization_score(
    transactions: &[TransactionRecord],
    credit_limit: Decimal,
    bands: &BandTable,
) -> f64 {
    if transactions.is_empty() {
        return 1.0;
    }

    if credit_limit <= Decimal::ZERO {
        return bands.otherwise;
    }

    let utilization = transactions
        .iter()
        .try_fold(Decimal::ZERO, |total, t| total.checked_add(t.amount))
        .and_then(|total| total.checked_div(credit_limit));

    match utilization {
        Some(ratio) => bands.lookup(to_f64(ratio)),
        None => bands.otherwise,
    }
}

/// Years since the earliest purchase, bucketed; 0.5 with no purchases
pub fn account_age_score(
    transactions: &[TransactionRecord],
    as_of: DateTime<Utc>,
    bands: &BandTable,
) -> f64 {
    let Some(oldest) = transactions.iter().map(|t| t.date).min() else {
        return NEUTRAL_AGE_SCORE;
    };

    let years = days_between(oldest, as_of) / DAYS_PER_YEAR;
    bands.lookup(years)
}

/// All five factors for an account
pub fn compute_factors(
    account: &Account,
    config: &FactorConfig,
    as_of: DateTime<Utc>,
) -> FactorScores {
    let payments = account.ledger().payments();
    let transactions = account.ledger().transactions();

    FactorScores {
        missed_payments: missed_payments_score(payments),
        payment_history: payment_history_score(payments),
        transaction_patterns: transaction_patterns_score(
            transactions,
            config.recent_window,
            as_of,
        ),
        credit_utilization: credit_utilization_score(
            transactions,
            account.credit_limit(),
            &config.utilization,
        ),
        account_age: account_age_score(transactions, as_of, &config.account_age),
    }
}

/// Lowest-scoring factor, by name
pub fn weakest_factor(factors: &FactorScores) -> (&'static str, f64) {
    [
        ("missed payments", factors.missed_payments),
        ("payment history", factors.payment_history),
        ("transaction patterns", factors.transaction_patterns),
        ("credit utilization", factors.credit_utilization),
        ("account age", factors.account_age),
    ]
    .into_iter()
    .fold(("missed payments", f64::INFINITY), |weakest, candidate| {
        if candidate.1 < weakest.1 {
            candidate
        } else {
            weakest
        }
    })
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1_000.0 / SECONDS_PER_DAY
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use credit_ledger::{PaymentId, TransactionId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn purchase(i: usize, amount: i64, days_ago: i64) -> TransactionRecord {
        TransactionRecord::new(
            TransactionId::new(format!("t{}", i)),
            Decimal::from(amount),
            now() - Duration::days(days_ago),
            "Acme",
        )
    }

    fn payment(i: usize, status: PaymentStatus) -> PaymentRecord {
        let due = now() - Duration::days(30);
        let id = PaymentId::new(format!("p{}", i));
        match status {
            PaymentStatus::Paid => PaymentRecord::paid(id, Decimal::from(50), due, due),
            PaymentStatus::Missed => PaymentRecord::missed(id, Decimal::from(50), due),
            PaymentStatus::Pending => PaymentRecord::pending(id, Decimal::from(50), due),
        }
    }

    #[test]
    fn test_empty_history_defaults() {
        let bands = FactorConfig::default();
        assert_eq!(missed_payments_score(&[]), 1.0);
        assert_eq!(payment_history_score(&[]), 1.0);
        assert_eq!(transaction_patterns_score(&[], 10, now()), 1.0);
        assert_eq!(
            credit_utilization_score(&[], Decimal::from(1000), &bands.utilization),
            1.0
        );
        assert_eq!(account_age_score(&[], now(), &bands.account_age), 0.5);
    }

    #[test]
    fn test_payment_scores() {
        let payments = vec![
            payment(0, PaymentStatus::Paid),
            payment(1, PaymentStatus::Paid),
            payment(2, PaymentStatus::Missed),
            payment(3, PaymentStatus::Pending),
        ];
        assert!((missed_payments_score(&payments) - 0.75).abs() < 1e-12);
        assert!((payment_history_score(&payments) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_late_payment_not_on_time() {
        let due = now() - Duration::days(10);
        let late = PaymentRecord::paid(PaymentId::new("late"), Decimal::from(10), due, due + Duration::days(1));
        assert_eq!(payment_history_score(&[late.clone()]), 0.0);
        assert_eq!(missed_payments_score(&[late]), 1.0);
    }

    #[test]
    fn test_patterns_steady_daily_spend() {
        // 10 equal purchases over 5 days: volatility 0, frequency 2/day
        let transactions: Vec<_> = (0..10).map(|i| purchase(i, 100, 5)).collect();
        assert!((transaction_patterns_score(&transactions, 10, now()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_patterns_volatile_sparse_spend() {
        // amounts 50,50,50,50,800: average 200, volatility 3.75 -> 0
        // 5 purchases over 100 days -> frequency 0.05 -> 0.025
        let transactions = vec![
            purchase(0, 50, 100),
            purchase(1, 50, 80),
            purchase(2, 50, 60),
            purchase(3, 50, 40),
            purchase(4, 800, 20),
        ];
        let score = transaction_patterns_score(&transactions, 10, now());
        assert!((score - 0.0125).abs() < 1e-9);
    }

    #[test]
    fn test_patterns_only_recent_window() {
        // Old volatile purchases fall outside a window of 3
        let transactions = vec![
            purchase(0, 5_000, 30),
            purchase(1, 100, 3),
            purchase(2, 100, 2),
            purchase(3, 100, 1),
        ];
        let score = transaction_patterns_score(&transactions, 3, now());
        // volatility 0 -> 1; 3 purchases over 3 days -> 0.5
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_patterns_zero_day_span() {
        let transactions = vec![purchase(0, 100, 0)];
        // single purchase "now": span treated as 1 day -> frequency 1 -> 0.5
        let score = transaction_patterns_score(&transactions, 10, now());
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_buckets() {
        let bands = FactorConfig::default().utilization;
        let limit = Decimal::from(1_000);
        let spend = |amount| vec![purchase(0, amount, 1)];

        assert_eq!(credit_utilization_score(&spend(100), limit, &bands), 1.0);
        assert_eq!(credit_utilization_score(&spend(300), limit, &bands), 0.8);
        assert_eq!(credit_utilization_score(&spend(650), limit, &bands), 0.6);
        assert_eq!(credit_utilization_score(&spend(800), limit, &bands), 0.4);
        assert_eq!(credit_utilization_score(&spend(1_500), limit, &bands), 0.2);
    }

    #[test]
    fn test_utilization_overflow_scores_worst_band() {
        let bands = FactorConfig::default().utilization;
        let half = Decimal::MAX / Decimal::TWO + Decimal::ONE;
        let transactions: Vec<_> = (0..2)
            .map(|i| {
                let mut t = purchase(i, 1, 1);
                t.amount = half;
                t
            })
            .collect();
        assert_eq!(
            credit_utilization_score(&transactions, Decimal::from(1_000), &bands),
            0.2
        );
    }

    #[test]
    fn test_account_age_buckets() {
        let bands = FactorConfig::default().account_age;
        let aged = |days| vec![purchase(0, 10, days), purchase(1, 10, 0)];

        assert_eq!(account_age_score(&aged(30), now(), &bands), 0.5);
        assert_eq!(account_age_score(&aged(200), now(), &bands), 0.7);
        assert_eq!(account_age_score(&aged(400), now(), &bands), 0.8);
        assert_eq!(account_age_score(&aged(800), now(), &bands), 1.0);
    }

    #[test]
    fn test_weakest_factor() {
        let factors = FactorScores {
            missed_payments: 0.9,
            payment_history: 0.8,
            transaction_patterns: 0.3,
            credit_utilization: 1.0,
            account_age: 0.5,
        };
        assert_eq!(weakest_factor(&factors), ("transaction patterns", 0.3));
    }
}

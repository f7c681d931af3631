//! Configuration for the risk engine
//!
//! Defaults reproduce the canonical scorecard. A TOML file may override any
//! subset of fields; multipliers are best written as strings
//! (`multiplier = "1.2"`) to keep them exact.

use crate::{Error, Result, RiskLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "CREDIT_RISK_CONFIG";

/// Risk engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Factor weights
    pub weights: RiskWeights,

    /// Factor parameters
    pub factors: FactorConfig,

    /// Tier thresholds and multipliers
    pub tiers: TierConfig,

    /// Pre-purchase checks
    pub affordability: AffordabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "credit-risk".to_string(),
            weights: RiskWeights::default(),
            factors: FactorConfig::default(),
            tiers: TierConfig::default(),
            affordability: AffordabilityConfig::default(),
        }
    }
}

/// Scorecard weights; must sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Missed-payment ratio
    pub missed_payments: f64,
    /// On-time payment ratio
    pub payment_history: f64,
    /// Recent purchase volatility and frequency
    pub transaction_patterns: f64,
    /// Spend against limit
    pub credit_utilization: f64,
    /// Account age
    pub account_age: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            missed_payments: 0.30,
            payment_history: 0.20,
            transaction_patterns: 0.20,
            credit_utilization: 0.15,
            account_age: 0.15,
        }
    }
}

impl RiskWeights {
    fn as_array(&self) -> [f64; 5] {
        [
            self.missed_payments,
            self.payment_history,
            self.transaction_patterns,
            self.credit_utilization,
            self.account_age,
        ]
    }

    /// Check weights are finite, non-negative and sum to 1
    pub fn validate(&self) -> Result<()> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidConfig(
                "weights must be finite and non-negative".to_string(),
            ));
        }

        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(Error::InvalidConfig(format!(
                "weights sum to {}, expected 1.0",
                total
            )));
        }
        Ok(())
    }
}

/// One step of a bucketed lookup: values below `below` score `score`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    /// Exclusive upper bound of the band
    pub below: f64,
    /// Score for values in the band
    pub score: f64,
}

/// Ordered bands plus a score for values past the last band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    /// Bands with strictly ascending `below`
    pub bands: Vec<ScoreBand>,
    /// Score when no band matches
    pub otherwise: f64,
}

impl BandTable {
    /// Score for `value`: first band with `value < below`
    pub fn lookup(&self, value: f64) -> f64 {
        self.bands
            .iter()
            .find(|band| value < band.below)
            .map_or(self.otherwise, |band| band.score)
    }

    fn validate(&self, name: &str) -> Result<()> {
        let in_unit = |s: f64| s.is_finite() && (0.0..=1.0).contains(&s);

        if !in_unit(self.otherwise) || self.bands.iter().any(|b| !in_unit(b.score)) {
            return Err(Error::InvalidConfig(format!(
                "{} band scores must lie in [0, 1]",
                name
            )));
        }

        if self
            .bands
            .windows(2)
            .any(|pair| !(pair[0].below < pair[1].below))
        {
            return Err(Error::InvalidConfig(format!(
                "{} bands must be strictly ascending",
                name
            )));
        }
        Ok(())
    }
}

/// Factor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    /// Number of most recent purchases sampled for pattern scoring
    pub recent_window: usize,

    /// Utilization ratio → score
    pub utilization: BandTable,

    /// Account age in years → score
    pub account_age: BandTable,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            recent_window: 10,
            utilization: BandTable {
                bands: vec![
                    ScoreBand { below: 0.3, score: 1.0 },
                    ScoreBand { below: 0.5, score: 0.8 },
                    ScoreBand { below: 0.7, score: 0.6 },
                    ScoreBand { below: 0.9, score: 0.4 },
                ],
                otherwise: 0.2,
            },
            account_age: BandTable {
                bands: vec![
                    ScoreBand { below: 0.5, score: 0.5 },
                    ScoreBand { below: 1.0, score: 0.7 },
                    ScoreBand { below: 2.0, score: 0.8 },
                ],
                otherwise: 1.0,
            },
        }
    }
}

impl FactorConfig {
    /// Check window and band tables
    pub fn validate(&self) -> Result<()> {
        if self.recent_window == 0 {
            return Err(Error::InvalidConfig(
                "recent_window must be at least 1".to_string(),
            ));
        }
        self.utilization.validate("utilization")?;
        self.account_age.validate("account_age")
    }
}

/// Tier threshold and limit multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Minimum score for the tier
    pub threshold: f64,
    /// Limit multiplier
    pub multiplier: Decimal,
}

/// Tier thresholds, checked LOW → MEDIUM → HIGH; anything below is CRITICAL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// LOW tier (default: score ≥ 0.7, ×1.2)
    pub low: Tier,
    /// MEDIUM tier (default: score ≥ 0.5, ×1.0)
    pub medium: Tier,
    /// HIGH tier (default: score ≥ 0.3, ×0.8)
    pub high: Tier,
    /// CRITICAL multiplier (default: ×0.5)
    pub critical_multiplier: Decimal,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            low: Tier {
                threshold: 0.7,
                multiplier: Decimal::new(12, 1),
            },
            medium: Tier {
                threshold: 0.5,
                multiplier: Decimal::ONE,
            },
            high: Tier {
                threshold: 0.3,
                multiplier: Decimal::new(8, 1),
            },
            critical_multiplier: Decimal::new(5, 1),
        }
    }
}

impl TierConfig {
    /// Tier for a score; first matching threshold wins
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= self.low.threshold {
            RiskLevel::Low
        } else if score >= self.medium.threshold {
            RiskLevel::Medium
        } else if score >= self.high.threshold {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Limit multiplier for a tier
    pub fn multiplier(&self, level: RiskLevel) -> Decimal {
        match level {
            RiskLevel::Low => self.low.multiplier,
            RiskLevel::Medium => self.medium.multiplier,
            RiskLevel::High => self.high.multiplier,
            RiskLevel::Critical => self.critical_multiplier,
        }
    }

    /// Thresholds strictly descending inside `[0, 1]`, multipliers positive
    pub fn validate(&self) -> Result<()> {
        let thresholds = [self.low.threshold, self.medium.threshold, self.high.threshold];
        if thresholds
            .iter()
            .any(|t| !t.is_finite() || !(0.0..=1.0).contains(t))
        {
            return Err(Error::InvalidConfig(
                "tier thresholds must lie in [0, 1]".to_string(),
            ));
        }

        if !(thresholds[0] > thresholds[1] && thresholds[1] > thresholds[2]) {
            return Err(Error::InvalidConfig(
                "tier thresholds must be strictly descending".to_string(),
            ));
        }

        let multipliers = [
            self.low.multiplier,
            self.medium.multiplier,
            self.high.multiplier,
            self.critical_multiplier,
        ];
        if multipliers.iter().any(|m| *m <= Decimal::ZERO) {
            return Err(Error::InvalidConfig(
                "tier multipliers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pre-purchase check limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffordabilityConfig {
    /// Maximum BNPL debt as a share of monthly income
    pub max_debt_to_income: f64,

    /// Open plans at which a warning is raised
    pub max_open_plans: usize,
}

impl Default for AffordabilityConfig {
    fn default() -> Self {
        Self {
            max_debt_to_income: 0.4,
            max_open_plans: 5,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(window) = std::env::var("CREDIT_RISK_RECENT_WINDOW") {
            config.factors.recent_window = parse_env("CREDIT_RISK_RECENT_WINDOW", &window)?;
        }

        if let Ok(ratio) = std::env::var("CREDIT_RISK_MAX_DTI") {
            config.affordability.max_debt_to_income = parse_env("CREDIT_RISK_MAX_DTI", &ratio)?;
        }

        if let Ok(plans) = std::env::var("CREDIT_RISK_MAX_OPEN_PLANS") {
            config.affordability.max_open_plans = parse_env("CREDIT_RISK_MAX_OPEN_PLANS", &plans)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// File named by `CREDIT_RISK_CONFIG` if set, environment otherwise
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.factors.validate()?;
        self.tiers.validate()?;

        let dti = self.affordability.max_debt_to_income;
        if !dti.is_finite() || dti <= 0.0 {
            return Err(Error::InvalidConfig(
                "max_debt_to_income must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} has invalid value {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "credit-risk");
        assert_eq!(config.factors.recent_window, 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_classify_descending_order() {
        let tiers = TierConfig::default();
        assert_eq!(tiers.classify(1.0), RiskLevel::Low);
        assert_eq!(tiers.classify(0.7), RiskLevel::Low);
        assert_eq!(tiers.classify(0.69), RiskLevel::Medium);
        assert_eq!(tiers.classify(0.5), RiskLevel::Medium);
        assert_eq!(tiers.classify(0.3), RiskLevel::High);
        assert_eq!(tiers.classify(0.29), RiskLevel::Critical);
        assert_eq!(tiers.classify(0.0), RiskLevel::Critical);
        assert_eq!(tiers.multiplier(RiskLevel::Low), Decimal::new(12, 1));
    }

    #[test]
    fn test_band_lookup() {
        let factors = FactorConfig::default();
        assert_eq!(factors.utilization.lookup(0.0), 1.0);
        assert_eq!(factors.utilization.lookup(0.3), 0.8);
        assert_eq!(factors.utilization.lookup(0.89), 0.4);
        assert_eq!(factors.utilization.lookup(0.9), 0.2);
        assert_eq!(factors.account_age.lookup(1.5), 0.8);
        assert_eq!(factors.account_age.lookup(2.0), 1.0);
    }

    #[test]
    fn test_invalid_weights() {
        let mut config = Config::default();
        config.weights.account_age = 0.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.weights = RiskWeights {
            missed_payments: 1.2,
            payment_history: -0.2,
            transaction_patterns: 0.0,
            credit_utilization: 0.0,
            account_age: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_tiers() {
        let mut config = Config::default();
        config.tiers.medium.threshold = 0.8;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tiers.critical_multiplier = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsorted_bands_rejected() {
        let mut config = Config::default();
        config.factors.utilization.bands.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
service_name = "credit-risk-staging"

[tiers.low]
threshold = 0.75
multiplier = "1.1"

[affordability]
max_open_plans = 3
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.service_name, "credit-risk-staging");
        assert_eq!(config.tiers.low.threshold, 0.75);
        assert_eq!(config.tiers.low.multiplier, Decimal::new(11, 1));
        assert_eq!(config.tiers.high.threshold, 0.3);
        assert_eq!(config.affordability.max_open_plans, 3);
        assert_eq!(config.weights, RiskWeights::default());
    }

    #[test]
    fn test_bad_toml_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "weights = 7").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }
}

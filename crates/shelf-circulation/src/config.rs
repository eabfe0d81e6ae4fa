use std::path::Path;

use serde::{Deserialize, Serialize};
use shelf_ledger::LoanPolicy;

use crate::error::{CirculationError, CirculationResult};

/// Configuration for the circulation desk.
///
/// Loaded from TOML; every key is optional and falls back to the default
/// library rules:
///
/// ```toml
/// max_current_checkouts = 10
///
/// [loan]
/// loan_period_days = 20
/// fine_per_day_cents = 20
/// reservation_cutoff = "18:00:00"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirculationConfig {
    /// Most current records one reader may hold across all copies.
    pub max_current_checkouts: usize,
    /// Loan period, fines, and reservation expiry.
    pub loan: LoanPolicy,
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            max_current_checkouts: 10,
            loan: LoanPolicy::default(),
        }
    }
}

impl CirculationConfig {
    pub fn from_toml_str(source: &str) -> CirculationResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| CirculationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> CirculationResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> CirculationResult<String> {
        toml::to_string_pretty(self).map_err(|e| CirculationError::Config(e.to_string()))
    }

    pub fn validate(&self) -> CirculationResult<()> {
        if self.max_current_checkouts == 0 {
            return Err(CirculationError::Config(
                "max_current_checkouts must be at least 1".into(),
            ));
        }
        self.loan
            .validate()
            .map_err(|e| CirculationError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use shelf_types::Money;

    #[test]
    fn default_config() {
        let c = CirculationConfig::default();
        assert_eq!(c.max_current_checkouts, 10);
        assert_eq!(c.loan.loan_period_days, 20);
        assert_eq!(c.loan.fine_per_day, Money::from_cents(20));
        assert_eq!(
            c.loan.reservation_cutoff,
            NaiveTime::from_hms_opt(18, 0, 0).unwrap()
        );
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c = CirculationConfig::from_toml_str("").unwrap();
        assert_eq!(c, CirculationConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let c = CirculationConfig::from_toml_str(
            r#"
            max_current_checkouts = 3

            [loan]
            reservation_cutoff = "17:30:00"
            "#,
        )
        .unwrap();

        assert_eq!(c.max_current_checkouts, 3);
        assert_eq!(c.loan.loan_period_days, 20);
        assert_eq!(
            c.loan.reservation_cutoff,
            NaiveTime::from_hms_opt(17, 30, 0).unwrap()
        );
    }

    #[test]
    fn toml_roundtrip() {
        let c = CirculationConfig::default();
        let text = c.to_toml_string().unwrap();
        assert!(text.contains("fine_per_day_cents = 20"));
        assert_eq!(CirculationConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let error = CirculationConfig::from_toml_str("max_current_checkouts = 0").unwrap_err();
        assert!(matches!(error, CirculationError::Config(_)));
    }

    #[test]
    fn out_of_range_loan_rules_are_rejected() {
        for source in [
            "[loan]\nloan_period_days = 9223372036854775807\n",
            "[loan]\nloan_period_days = 3651\n",
            "[loan]\nloan_period_days = -1\n",
            "[loan]\nfine_per_day_cents = 9223372036854775807\n",
            "[loan]\nfine_per_day_cents = -5\n",
        ] {
            let error = CirculationConfig::from_toml_str(source).unwrap_err();
            assert!(matches!(error, CirculationError::Config(_)), "{source}");
        }
        CirculationConfig::from_toml_str("[loan]\nloan_period_days = 3650\n").unwrap();
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circulation.toml");
        std::fs::write(&path, "[loan]\nloan_period_days = 14\n").unwrap();

        let c = CirculationConfig::load(&path).unwrap();
        assert_eq!(c.loan.loan_period_days, 14);
    }
}

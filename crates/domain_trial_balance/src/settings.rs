//! Engine configuration
//!
//! Settings are read from an optional file plus `TRIAL_BALANCE_*`
//! environment variables, with a `.env` file loaded first when present.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::TrialBalanceError;

const ENV_PREFIX: &str = "TRIAL_BALANCE";

/// Day count used to average daily balances over a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageBalanceBasis {
    /// Calendar days of the period
    #[default]
    Calendar,
    /// 30-day months, 360-day years
    Commercial,
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Master-data code of the domestic currency
    pub domestic_currency_code: String,
    /// Largest difference accepted by the consistency checks
    pub validation_tolerance: Decimal,
    pub cache_enabled: bool,
    pub average_balance_days_basis: AverageBalanceBasis,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            domestic_currency_code: "01".to_string(),
            validation_tolerance: dec!(10),
            cache_enabled: true,
            average_balance_days_basis: AverageBalanceBasis::Calendar,
        }
    }
}

impl EngineSettings {
    /// Loads settings from `.env` and the environment
    pub fn from_env() -> Result<Self, TrialBalanceError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }
        Self::build(None)
    }

    /// Loads settings from `path` (if it exists), overridden by the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TrialBalanceError> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> Result<Self, TrialBalanceError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings: Self = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings the engine cannot run with
    pub fn validate(&self) -> Result<(), TrialBalanceError> {
        let code = &self.domestic_currency_code;
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(TrialBalanceError::Configuration(format!(
                "domestic_currency_code must be numeric, got '{code}'"
            )));
        }
        if self.validation_tolerance.is_sign_negative() {
            return Err(TrialBalanceError::Configuration(format!(
                "validation_tolerance must not be negative, got {}",
                self.validation_tolerance
            )));
        }
        Ok(())
    }

    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.validation_tolerance = tolerance;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.domestic_currency_code, "01");
        assert_eq!(settings.validation_tolerance, dec!(10));
        assert!(settings.cache_enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let settings = EngineSettings::default().with_tolerance(dec!(-1));
        assert!(matches!(settings.validate(), Err(TrialBalanceError::Configuration(_))));
    }

    #[test]
    fn test_loads_partial_file() {
        let path = std::env::temp_dir().join(format!("trial-balance-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "validation_tolerance = 0.5").unwrap();
        writeln!(file, "average_balance_days_basis = \"commercial\"").unwrap();
        drop(file);

        let settings = EngineSettings::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.validation_tolerance, dec!(0.5));
        assert_eq!(settings.average_balance_days_basis, AverageBalanceBasis::Commercial);
        assert_eq!(settings.domestic_currency_code, "01");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = EngineSettings::from_file("/nonexistent/trial-balance.toml").unwrap();
        assert_eq!(settings.validation_tolerance, dec!(10));
    }
}

//! Analytics configuration.
//!
//! Loaded from a TOML file. Every field has a default, so a partial file (or
//! no file at all) is valid.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "WEALTHPILOT_CONFIG";

/// Tunable constants of the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Annual risk-free rate as a decimal (0.04 = 4%)
    pub risk_free_rate: f64,
    /// Trading days used for annualization
    pub trading_days_per_year: usize,
    /// Confidence level for historical VaR
    pub var_confidence: f64,
    /// Aligned observations required before beta is estimated
    pub min_beta_observations: usize,
    /// Aligned observations required per correlation pair
    pub min_correlation_observations: usize,
    /// Windows (in trading days) for rolling annualized returns
    pub rolling_windows: Vec<usize>,
    /// Time-to-live for cached market data
    pub cache_ttl_minutes: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            trading_days_per_year: 252,
            var_confidence: 0.95,
            min_beta_observations: 11,
            min_correlation_observations: 20,
            rolling_windows: vec![21, 63, 126, 252],
            cache_ttl_minutes: 15,
        }
    }
}

impl AnalyticsConfig {
    /// Get the default configuration file path.
    ///
    /// Default path: `~/.wealthpilot/analytics.toml`
    /// Can be overridden with the `WEALTHPILOT_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".wealthpilot/analytics.toml"))
            .unwrap_or_else(|| PathBuf::from("analytics.toml"))
    }

    /// Load from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load from a specific path. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable by the calculators.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidConfig("risk_free_rate must be finite".to_string()));
        }
        if self.trading_days_per_year == 0 {
            return Err(Error::InvalidConfig(
                "trading_days_per_year must be positive".to_string(),
            ));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "var_confidence must be in (0, 1), got {}",
                self.var_confidence
            )));
        }
        if self.min_beta_observations < 2 || self.min_correlation_observations < 2 {
            return Err(Error::InvalidConfig(
                "minimum observation counts must be at least 2".to_string(),
            ));
        }
        if self.rolling_windows.contains(&0) {
            return Err(Error::InvalidConfig("rolling windows must be positive".to_string()));
        }
        if self.cache_ttl_minutes < 0 {
            return Err(Error::InvalidConfig("cache_ttl_minutes must be >= 0".to_string()));
        }
        Ok(())
    }

    /// Risk-free rate per trading day.
    pub fn daily_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.trading_days_per_year as f64
    }

    /// `sqrt(trading days)`, the volatility annualization factor.
    pub fn annualization_factor(&self) -> f64 {
        (self.trading_days_per_year as f64).sqrt()
    }
}

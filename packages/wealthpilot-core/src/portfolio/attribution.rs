//! Sector, security-class and factor attribution.

use super::performance::HoldingValuation;
use crate::stats::{mean, safe_div};
use crate::types::SecurityClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sector label for holdings without one.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Weight, return and contribution of one sector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorAttribution {
    pub sector: String,
    /// Share of total value, percent
    pub weight_pct: f64,
    /// Unweighted mean of the members' period returns, percent
    pub return_pct: f64,
    /// `weight_pct * return_pct / 100`
    pub contribution: f64,
    pub holdings: Vec<String>,
}

/// Weight of one security class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassAllocation {
    pub security_class: SecurityClass,
    pub value: f64,
    /// Share of total value, percent
    pub weight_pct: f64,
    pub holdings: usize,
}

/// Origin of a set of factor exposures.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactorModelKind {
    /// Fixed linear transforms of portfolio beta, momentum and volatility.
    /// Not a cross-sectional regression on fundamentals.
    #[default]
    Heuristic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Market,
    Size,
    Value,
    Momentum,
    Quality,
    LowVolatility,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorExposure {
    pub factor: Factor,
    pub exposure: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FactorExposures {
    pub kind: FactorModelKind,
    pub exposures: Vec<FactorExposure>,
}

impl FactorExposures {
    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.exposures
            .iter()
            .find(|e| e.factor == factor)
            .map(|e| e.exposure)
    }
}

/// Everything the attribution step reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Attribution {
    pub sectors: Vec<SectorAttribution>,
    pub classes: Vec<ClassAllocation>,
    pub factors: FactorExposures,
}

/// Group holdings by sector.
///
/// Weights use `total_value` (cash included) as denominator. Holdings
/// without a period return still count towards the weight but not the
/// return average.
pub fn sector_attribution(valuations: &[HoldingValuation], total_value: f64) -> Vec<SectorAttribution> {
    let mut groups: BTreeMap<&str, Vec<&HoldingValuation>> = BTreeMap::new();
    for v in valuations {
        let sector = v.sector.as_deref().unwrap_or(UNKNOWN_SECTOR);
        groups.entry(sector).or_default().push(v);
    }

    groups
        .into_iter()
        .map(|(sector, members)| {
            let value: f64 = members.iter().map(|v| v.market_value).sum();
            let weight_pct = safe_div(value, total_value) * 100.0;

            let returns: Vec<f64> = members.iter().filter_map(|v| v.period_return).collect();
            let return_pct = mean(&returns);

            SectorAttribution {
                sector: sector.to_string(),
                weight_pct,
                return_pct,
                contribution: weight_pct * return_pct / 100.0,
                holdings: members.iter().map(|v| v.symbol.clone()).collect(),
            }
        })
        .collect()
}

/// Value and weight per security class.
pub fn class_allocation(valuations: &[HoldingValuation], total_value: f64) -> Vec<ClassAllocation> {
    let mut groups: BTreeMap<SecurityClass, (f64, usize)> = BTreeMap::new();
    for v in valuations {
        let entry = groups.entry(v.security_class).or_default();
        entry.0 += v.market_value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(security_class, (value, holdings))| ClassAllocation {
            security_class,
            value,
            weight_pct: safe_div(value, total_value) * 100.0,
            holdings,
        })
        .collect()
}

/// Heuristic factor exposures from portfolio-level statistics.
///
/// # Arguments
///
/// * `beta` - Portfolio beta against the benchmark
/// * `momentum_pct` - Period return, percent
/// * `volatility_pct` - Annualized volatility, percent
///
/// Every exposure except market is clamped to `[-1, 1]`.
pub fn heuristic_factor_exposures(beta: f64, momentum_pct: f64, volatility_pct: f64) -> FactorExposures {
    let clamp = |x: f64| if x.is_finite() { x.clamp(-1.0, 1.0) } else { 0.0 };

    let exposures = vec![
        FactorExposure {
            factor: Factor::Market,
            exposure: if beta.is_finite() { beta } else { 1.0 },
            description: "Portfolio beta".to_string(),
        },
        FactorExposure {
            factor: Factor::Size,
            exposure: clamp((1.0 - beta) * 0.5),
            description: "Small-cap tilt inferred from beta below 1".to_string(),
        },
        FactorExposure {
            factor: Factor::Value,
            exposure: clamp(-momentum_pct / 50.0),
            description: "Value tilt inferred from negative momentum".to_string(),
        },
        FactorExposure {
            factor: Factor::Momentum,
            exposure: clamp(momentum_pct / 50.0),
            description: "Period return scaled by 50%".to_string(),
        },
        FactorExposure {
            factor: Factor::Quality,
            exposure: clamp((20.0 - volatility_pct) / 20.0),
            description: "Volatility below 20% read as quality".to_string(),
        },
        FactorExposure {
            factor: Factor::LowVolatility,
            exposure: clamp((15.0 - volatility_pct) / 15.0),
            description: "Volatility below 15% read as low-vol".to_string(),
        },
    ];

    FactorExposures {
        kind: FactorModelKind::Heuristic,
        exposures,
    }
}

//! Rolling and calendar-period returns over a value series.

use crate::stats::finite_or_zero;
use crate::types::ValuePoint;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annualized return ending at `date`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RollingPoint {
    pub date: NaiveDate,
    /// Annualized return, percent
    pub annualized_return: f64,
}

/// Rolling annualized returns for one window length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollingReturns {
    /// Window length in trading days
    pub window: usize,
    pub points: Vec<RollingPoint>,
}

/// Return for one calendar month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    /// 1 = January
    pub month: u32,
    /// Percent
    pub return_pct: f64,
}

/// Monthly returns laid out as `year -> month -> return %`, plus the flat
/// list and its distribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthlyHeatmap {
    pub years: BTreeMap<i32, BTreeMap<u32, f64>>,
    pub returns: Vec<MonthlyReturn>,
    pub best_month: Option<MonthlyReturn>,
    pub worst_month: Option<MonthlyReturn>,
    pub positive_months: usize,
    pub negative_months: usize,
}

/// Return for one calendar year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnnualReturn {
    pub year: i32,
    /// Percent
    pub return_pct: f64,
}

/// Everything the aggregator derives from one value series.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodicReturns {
    pub rolling: Vec<RollingReturns>,
    pub monthly: MonthlyHeatmap,
    pub annual: Vec<AnnualReturn>,
}

/// Compute rolling, monthly and annual returns.
pub fn periodic_returns(
    values: &[ValuePoint],
    windows: &[usize],
    trading_days_per_year: usize,
) -> PeriodicReturns {
    PeriodicReturns {
        rolling: windows
            .iter()
            .map(|&window| rolling_returns(values, window, trading_days_per_year))
            .collect(),
        monthly: monthly_heatmap(values),
        annual: annual_returns(values),
    }
}

/// Total return from the first to the last value, percent.
pub fn total_return(values: &[ValuePoint]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && first.value > 0.0 => {
            (last.value / first.value - 1.0) * 100.0
        }
        _ => 0.0,
    }
}

/// Annualized return over every trailing window of `window` periods.
///
/// For each index `i >= window`, `(1 + value[i] / value[i - window] - 1)^(252 / window) - 1`.
/// Empty when the series has fewer than `window + 1` points.
pub fn rolling_returns(values: &[ValuePoint], window: usize, trading_days_per_year: usize) -> RollingReturns {
    let mut points = Vec::new();

    if window > 0 && values.len() > window {
        let exponent = trading_days_per_year as f64 / window as f64;
        for i in window..values.len() {
            let base = values[i - window].value;
            if base <= 0.0 {
                continue;
            }
            let period_return = values[i].value / base - 1.0;
            points.push(RollingPoint {
                date: values[i].date,
                annualized_return: finite_or_zero(((1.0 + period_return).powf(exponent) - 1.0) * 100.0),
            });
        }
    }

    RollingReturns { window, points }
}

/// Group values by `(year, month)`; each month's return is its last value
/// over its first value.
pub fn monthly_heatmap(values: &[ValuePoint]) -> MonthlyHeatmap {
    let mut heatmap = MonthlyHeatmap::default();

    for ((year, month), ret) in group_returns(values, |d| (d.year(), d.month())) {
        heatmap.years.entry(year).or_default().insert(month, ret);
        heatmap.returns.push(MonthlyReturn {
            year,
            month,
            return_pct: ret,
        });
    }

    heatmap.positive_months = heatmap.returns.iter().filter(|m| m.return_pct > 0.0).count();
    heatmap.negative_months = heatmap.returns.iter().filter(|m| m.return_pct < 0.0).count();
    heatmap.best_month = heatmap
        .returns
        .iter()
        .copied()
        .max_by(|a, b| a.return_pct.total_cmp(&b.return_pct));
    heatmap.worst_month = heatmap
        .returns
        .iter()
        .copied()
        .min_by(|a, b| a.return_pct.total_cmp(&b.return_pct));

    heatmap
}

/// Group values by year; each year's return is its last value over its
/// first value.
pub fn annual_returns(values: &[ValuePoint]) -> Vec<AnnualReturn> {
    group_returns(values, |d| d.year())
        .into_iter()
        .map(|(year, return_pct)| AnnualReturn { year, return_pct })
        .collect()
}

fn group_returns<K, F>(values: &[ValuePoint], key: F) -> Vec<(K, f64)>
where
    K: Ord + Copy,
    F: Fn(&NaiveDate) -> K,
{
    let mut bounds: BTreeMap<K, (f64, f64)> = BTreeMap::new();
    for point in values {
        bounds
            .entry(key(&point.date))
            .and_modify(|(_, last)| *last = point.value)
            .or_insert((point.value, point.value));
    }

    bounds
        .into_iter()
        .map(|(k, (first, last))| {
            let ret = if first > 0.0 {
                (last / first - 1.0) * 100.0
            } else {
                0.0
            };
            (k, ret)
        })
        .collect()
}

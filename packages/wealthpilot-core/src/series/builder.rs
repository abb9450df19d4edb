//! Portfolio and benchmark return series construction.
//!
//! Price histories are aligned onto one trading-date grid, the lookback
//! window is applied, and the portfolio's daily return is the weighted sum
//! of its holdings' daily returns using weights taken from *current* market
//! values.

use crate::market::MarketData;
use crate::stats::{safe_div, EPSILON};
use crate::types::{Period, PriceSeries, ReturnSeries, ValuePoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How position sizes are projected onto the historical window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WeightingStrategy {
    /// Today's weights applied unchanged to every historical day. This is an
    /// approximation, not a simulation of historical position sizes.
    #[default]
    FixedCurrentWeight,
}

/// One holding's contribution to the aligned portfolio series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentSeries {
    pub symbol: String,
    /// Fixed weight as a decimal; weights of all components sum to 1
    pub weight: f64,
    /// Return over the window, percent
    pub period_return: f64,
    /// The holding's own daily returns inside the window (not carried)
    pub returns: ReturnSeries,
}

/// Output of [`build_return_series`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub strategy: WeightingStrategy,
    /// Trading-date grid inside the window; returns are dated `dates[1..]`
    pub dates: Vec<NaiveDate>,
    pub portfolio: ReturnSeries,
    /// Portfolio returns since the last close of the previous calendar
    /// year, independent of the window
    pub ytd: ReturnSeries,
    pub benchmark: ReturnSeries,
    /// Growth along the grid, ending at the current value of every priced
    /// holding (including those priced only by a quote)
    pub portfolio_values: Vec<ValuePoint>,
    /// Benchmark rebased to the portfolio's first value
    pub benchmark_values: Vec<ValuePoint>,
    pub components: Vec<ComponentSeries>,
    /// Symbols left out because their price history was missing or too short
    pub excluded: Vec<String>,
}

impl AlignedSeries {
    /// Whether the portfolio series has enough observations for statistics.
    pub fn has_sufficient_data(&self) -> bool {
        self.portfolio.len() >= 2
    }

    /// Period return of a component, percent.
    pub fn component_return(&self, symbol: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
            .map(|c| c.period_return)
    }
}

/// Build the aligned portfolio and benchmark return series.
///
/// # Arguments
///
/// * `positions` - `(symbol, current market value)` for every holding
/// * `market` - price histories for the holdings and the benchmark
/// * `period` - lookback window applied after alignment
///
/// Symbols without at least two prices are excluded and logged; the
/// remaining weights are renormalized. Fewer than two aligned dates
/// produce an empty portfolio series rather than an error.
pub fn build_return_series(
    positions: &[(String, f64)],
    market: &MarketData,
    period: Period,
) -> AlignedSeries {
    let mut excluded = Vec::new();
    let mut included: Vec<(&str, f64, &PriceSeries)> = Vec::new();

    for (symbol, value) in positions {
        match market.prices_for(symbol) {
            Some(series) if series.len() >= 2 => {
                if *value > 0.0 {
                    included.push((symbol.as_str(), *value, series));
                } else {
                    tracing::debug!(symbol = %symbol, "Skipping position with no market value");
                }
            }
            _ => {
                tracing::warn!(symbol = %symbol, "Excluding symbol with missing or short price history");
                excluded.push(symbol.clone());
            }
        }
    }

    let benchmark = (market.benchmark.len() >= 2).then_some(&market.benchmark);
    if benchmark.is_none() {
        tracing::warn!("Benchmark price history unavailable; benchmark metrics will use defaults");
    }

    let sources: Vec<&PriceSeries> = included
        .iter()
        .map(|(_, _, series)| *series)
        .chain(benchmark)
        .collect();

    let Some(grid) = common_grid(&sources) else {
        return AlignedSeries {
            excluded,
            ..Default::default()
        };
    };
    let start = period.window_start(&grid);
    let dates = grid[start..].to_vec();

    tracing::debug!(
        period = %period,
        points = dates.len(),
        holdings = included.len(),
        "Aligned price histories"
    );

    if dates.len() < 2 {
        return AlignedSeries {
            dates,
            excluded,
            ..Default::default()
        };
    }

    let first = dates[0];
    let last = dates[dates.len() - 1];
    let weight_base: f64 = included.iter().map(|(_, value, _)| value).sum();
    // Holdings priced only by a quote still count towards the history's scale
    let invested_value: f64 = positions.iter().map(|(_, value)| value.max(0.0)).sum();

    // Daily returns over the whole grid; the window is a suffix of it
    let mut daily = vec![0.0; grid.len() - 1];
    let mut components = Vec::with_capacity(included.len());

    for (symbol, value, series) in &included {
        let weight = value / weight_base;
        let prices = carry_forward(series, &grid);

        for (t, r) in daily.iter_mut().enumerate() {
            *r += weight * (prices[t + 1] / prices[t] - 1.0);
        }

        components.push(ComponentSeries {
            symbol: symbol.to_string(),
            weight,
            period_return: (prices[prices.len() - 1] / prices[start] - 1.0) * 100.0,
            returns: window_returns(series, first, last),
        });
    }

    let (portfolio, ytd, portfolio_values) = if included.is_empty() {
        (ReturnSeries::default(), ReturnSeries::default(), Vec::new())
    } else {
        let window = &daily[start..];
        let ytd_start = Period::YearToDate.window_start(&grid);
        (
            ReturnSeries::from_parts(&dates[1..], window),
            ReturnSeries::from_parts(&grid[ytd_start + 1..], &daily[ytd_start..]),
            growth_values(&dates, window, invested_value),
        )
    };

    let (benchmark, benchmark_values) = match benchmark {
        Some(series) => {
            let prices = carry_forward(series, &dates);
            let returns: Vec<f64> = prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
            let base = portfolio_values.first().map(|v| v.value).unwrap_or(prices[0]);
            let values = dates
                .iter()
                .zip(&prices)
                .map(|(&date, price)| ValuePoint {
                    date,
                    value: price / prices[0] * base,
                })
                .collect();
            (ReturnSeries::from_parts(&dates[1..], &returns), values)
        }
        None => (ReturnSeries::default(), Vec::new()),
    };

    AlignedSeries {
        strategy: WeightingStrategy::FixedCurrentWeight,
        dates,
        portfolio,
        ytd,
        benchmark,
        portfolio_values,
        benchmark_values,
        components,
        excluded,
    }
}

/// Union of trading dates inside the range every source covers.
fn common_grid(sources: &[&PriceSeries]) -> Option<Vec<NaiveDate>> {
    let start = sources.iter().filter_map(|s| s.first_date()).max()?;
    let end = sources.iter().filter_map(|s| s.last_date()).min()?;
    if start > end {
        tracing::warn!(%start, %end, "Price histories do not overlap");
        return None;
    }

    let dates: BTreeSet<NaiveDate> = sources
        .iter()
        .flat_map(|s| s.points().iter().map(|p| p.date))
        .filter(|d| (start..=end).contains(d))
        .collect();

    Some(dates.into_iter().collect())
}

/// Price on each grid date, carrying the last known price over gaps.
fn carry_forward(series: &PriceSeries, grid: &[NaiveDate]) -> Vec<f64> {
    let points = series.points();
    let mut idx = 0;
    let mut last = points.first().map(|p| p.price()).unwrap_or(0.0);

    grid.iter()
        .map(|date| {
            while idx < points.len() && points[idx].date <= *date {
                last = points[idx].price();
                idx += 1;
            }
            last
        })
        .collect()
}

/// A symbol's own daily returns dated inside `(first, last]`.
fn window_returns(series: &PriceSeries, first: NaiveDate, last: NaiveDate) -> ReturnSeries {
    let mut returns = series.daily_returns();
    returns.points.retain(|p| p.date > first && p.date <= last);
    returns
}

/// Compound `returns` along `dates`, scaled so the final point equals
/// `final_value`.
fn growth_values(dates: &[NaiveDate], returns: &[f64], final_value: f64) -> Vec<ValuePoint> {
    let mut growth = Vec::with_capacity(dates.len());
    growth.push(1.0);
    for r in returns {
        let prev = growth[growth.len() - 1];
        growth.push(prev * (1.0 + r));
    }

    let last = growth[growth.len() - 1];
    let scale = if last > EPSILON {
        safe_div(final_value, last)
    } else {
        1.0
    };

    dates
        .iter()
        .zip(growth)
        .map(|(&date, g)| ValuePoint {
            date,
            value: g * scale,
        })
        .collect()
}

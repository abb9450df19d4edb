//! Analytics orchestration.
//!
//! Values the holdings, builds the aligned return series once, then fans
//! the independent calculators out over rayon and merges their output into
//! a [`MetricsResult`].

use crate::config::AnalyticsConfig;
use crate::market::MarketData;
use crate::portfolio::{
    analyze_drawdowns, apply_period_returns, calculate_risk_metrics, class_allocation,
    correlation_matrix, heuristic_factor_exposures, position_values, sector_attribution,
    value_holdings, Attribution, CashFlowContext, CorrelationMatrix, DrawdownAnalysis,
    FactorExposures, HoldingValuation, PerformanceSummary, RiskMetrics,
};
use crate::series::{build_return_series, periodic_returns, AlignedSeries, PeriodicReturns, WeightingStrategy};
use crate::types::{Period, PortfolioSnapshot, ReturnSeries};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything needed for one analytics run, as read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    pub snapshot: PortfolioSnapshot,
    #[serde(flatten)]
    pub market: MarketData,
    #[serde(default)]
    pub period: Period,
}

/// One point of the value history chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    /// Benchmark rebased to the portfolio's starting value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_value: Option<f64>,
}

/// Full output of one analytics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResult {
    pub period: Period,
    pub benchmark_symbol: String,
    pub weighting: WeightingStrategy,
    pub performance: PerformanceSummary,
    pub risk: RiskMetrics,
    pub holdings: Vec<HoldingValuation>,
    pub history: Vec<HistoryPoint>,
    pub periodic: PeriodicReturns,
    pub drawdown: DrawdownAnalysis,
    pub correlation: CorrelationMatrix,
    pub attribution: Attribution,
    /// Holdings left out of the return series for lack of price history
    pub excluded_symbols: Vec<String>,
}

/// Analytics engine bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Bind a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) when
    /// `config` fails [`AnalyticsConfig::validate`].
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run a deserialized request.
    pub fn run(&self, request: &AnalyticsRequest) -> Result<MetricsResult> {
        self.compute(&request.snapshot, &request.market, request.period)
    }

    /// Compute every metric for `snapshot` over `period`.
    ///
    /// # Errors
    ///
    /// Only a structurally invalid snapshot is an error. Missing prices,
    /// short histories and degenerate statistics produce zero defaults.
    pub fn compute(
        &self,
        snapshot: &PortfolioSnapshot,
        market: &MarketData,
        period: Period,
    ) -> Result<MetricsResult> {
        snapshot.validate()?;
        let config = &self.config;

        let mut holdings = value_holdings(snapshot, market);
        let aligned = build_return_series(&position_values(&holdings), market, period);
        apply_period_returns(&mut holdings, &aligned);

        if !aligned.has_sufficient_data() {
            tracing::debug!(
                period = %period,
                returns = aligned.portfolio.len(),
                "Insufficient aligned data; return metrics use defaults"
            );
        }

        let context = CashFlowContext::from_valuations(&holdings, snapshot.cash_balance);
        let series = correlation_inputs(&aligned, &snapshot.benchmark_symbol);

        let ((risk, drawdown), (periodic, (correlation, sectors))) = rayon::join(
            || {
                rayon::join(
                    || calculate_risk_metrics(&aligned.portfolio, &aligned.benchmark, config),
                    || analyze_drawdowns(&aligned.portfolio_values),
                )
            },
            || {
                rayon::join(
                    || {
                        periodic_returns(
                            &aligned.portfolio_values,
                            &config.rolling_windows,
                            config.trading_days_per_year,
                        )
                    },
                    || {
                        rayon::join(
                            || correlation_matrix(&series, config.min_correlation_observations),
                            || sector_attribution(&holdings, context.total_value),
                        )
                    },
                )
            },
        );

        let performance = PerformanceSummary::calculate(
            &holdings,
            snapshot.cash_balance,
            &aligned.portfolio,
            &aligned.ytd,
            &aligned.benchmark,
            config.trading_days_per_year,
        );

        let factors = if aligned.has_sufficient_data() {
            heuristic_factor_exposures(risk.beta, performance.period_return, risk.volatility)
        } else {
            FactorExposures::default()
        };

        let attribution = Attribution {
            sectors,
            classes: class_allocation(&holdings, context.total_value),
            factors,
        };

        tracing::debug!(
            holdings = holdings.len(),
            returns = aligned.portfolio.len(),
            excluded = aligned.excluded.len(),
            "Analytics complete"
        );

        Ok(MetricsResult {
            period,
            benchmark_symbol: snapshot.benchmark_symbol.clone(),
            weighting: aligned.strategy,
            performance,
            risk,
            history: history(&aligned),
            holdings,
            periodic,
            drawdown,
            correlation,
            attribution,
            excluded_symbols: aligned.excluded,
        })
    }
}

/// Compute analytics with the default configuration.
pub fn compute_analytics(
    snapshot: &PortfolioSnapshot,
    market: &MarketData,
    period: Period,
) -> Result<MetricsResult> {
    AnalyticsEngine::default().compute(snapshot, market, period)
}

/// Each priced component's own returns, then the benchmark.
fn correlation_inputs(aligned: &AlignedSeries, benchmark_symbol: &str) -> Vec<(String, ReturnSeries)> {
    let mut series: Vec<(String, ReturnSeries)> = aligned
        .components
        .iter()
        .map(|c| (c.symbol.clone(), c.returns.clone()))
        .collect();

    if !aligned.benchmark.is_empty() {
        series.push((benchmark_symbol.to_string(), aligned.benchmark.clone()));
    }
    series
}

fn history(aligned: &AlignedSeries) -> Vec<HistoryPoint> {
    aligned
        .portfolio_values
        .iter()
        .enumerate()
        .map(|(i, point)| HistoryPoint {
            date: point.date,
            portfolio_value: point.value,
            benchmark_value: aligned.benchmark_values.get(i).map(|b| b.value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Factor;
    use crate::types::{Holding, PriceSeries};
    use crate::Error;
    use approx::assert_abs_diff_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn prices(n: usize, drift: f64, wiggle: f64) -> PriceSeries {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 * (1.0 + drift).powi(i as i32) + wiggle * ((i as f64) * 0.9).sin())
            .collect();
        PriceSeries::from_closes(start(), &closes)
    }

    fn market() -> MarketData {
        MarketData::new(prices(60, 0.0005, 1.0))
            .with_prices("AAPL", prices(60, 0.001, 2.0))
            .with_prices("XOM", prices(60, -0.0005, 1.5))
    }

    fn snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot::new("SPY")
            .with_holding(Holding::new("AAPL", 10.0, 90.0).with_sector("Technology"))
            .with_holding(Holding::new("XOM", 20.0, 110.0).with_sector("Energy"))
            .with_cash(500.0)
    }

    #[test]
    fn test_compute_full_result() {
        let result = compute_analytics(&snapshot(), &market(), Period::Max).unwrap();

        assert_eq!(result.benchmark_symbol, "SPY");
        assert_eq!(result.weighting, WeightingStrategy::FixedCurrentWeight);
        assert_eq!(result.holdings.len(), 2);
        assert_eq!(result.risk.observations, 59);
        assert_eq!(result.history.len(), 60);
        assert!(result.history.iter().all(|h| h.benchmark_value.is_some()));
        assert_eq!(result.correlation.symbols, vec!["AAPL", "XOM", "SPY"]);
        assert_eq!(result.attribution.sectors.len(), 2);
        assert_eq!(result.attribution.factors.exposures.len(), 6);
        assert_eq!(
            result.attribution.factors.get(Factor::Market),
            Some(result.risk.beta)
        );
        assert!(result.excluded_symbols.is_empty());

        // History ends at the invested value
        let last = result.history.last().unwrap();
        assert_abs_diff_eq!(last.portfolio_value, result.performance.invested_value, epsilon = 1e-6);
        assert_abs_diff_eq!(
            result.performance.total_value,
            result.performance.invested_value + 500.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_period_return_matches_history() {
        let result = compute_analytics(&snapshot(), &market(), Period::OneMonth).unwrap();

        let first = result.history.first().unwrap().portfolio_value;
        let last = result.history.last().unwrap().portfolio_value;
        assert_eq!(result.risk.observations, 21);
        assert_abs_diff_eq!(
            result.performance.period_return,
            (last / first - 1.0) * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_cash_only_portfolio() {
        let snapshot = PortfolioSnapshot::new("SPY").with_cash(1000.0);
        let result = compute_analytics(&snapshot, &market(), Period::OneYear).unwrap();

        assert_eq!(result.risk, RiskMetrics::default());
        assert_eq!(result.performance.total_value, 1000.0);
        assert!(result.attribution.factors.exposures.is_empty());
        assert!(result.history.is_empty());
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let snapshot = PortfolioSnapshot::new("SPY");
        let result = compute_analytics(&snapshot, &market(), Period::OneYear);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_run_request_from_json() {
        let json = r#"{
            "snapshot": {
                "holdings": [{"symbol": "AAPL", "shares": 2, "cost_basis": 100}],
                "cash_balance": 50
            },
            "prices": {
                "AAPL": [
                    {"date": "2024-01-02", "close": 100.0},
                    {"date": "2024-01-03", "close": 101.0},
                    {"date": "2024-01-04", "close": 103.0}
                ]
            },
            "benchmark": [
                {"date": "2024-01-02", "close": 400.0},
                {"date": "2024-01-03", "close": 404.0},
                {"date": "2024-01-04", "close": 402.0}
            ],
            "period": "max"
        }"#;

        let request: AnalyticsRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.period, Period::Max);
        assert_eq!(request.snapshot.benchmark_symbol, "SPY");

        let result = AnalyticsEngine::default().run(&request).unwrap();
        assert_abs_diff_eq!(result.performance.period_return, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.performance.total_value, 256.0, epsilon = 1e-9);
    }
}

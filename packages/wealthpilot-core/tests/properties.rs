//! Property tests for analytics invariants.
//!
//! Uses proptest to verify:
//! 1. Compounding identity: the periodic aggregator and the performance
//!    summary agree on the period return
//! 2. Correlation matrix: unit diagonal, symmetry, entries in [-1, 1]
//! 3. Beta of a series against itself is 1
//! 4. Drawdown points lie between the max drawdown and 0
//! 5. Constant prices never produce NaN or infinite ratios

use chrono::NaiveDate;
use proptest::prelude::*;
use wealthpilot_core::portfolio::{analyze_drawdowns, beta, correlation_matrix};
use wealthpilot_core::series::total_return;
use wealthpilot_core::{
    calculate_risk_metrics, compute_analytics, AnalyticsConfig, Holding, MarketData, Period,
    PortfolioSnapshot, PriceSeries, ReturnSeries, ValuePoint,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
}

fn prices_from_returns(returns: &[f64]) -> PriceSeries {
    let mut closes = Vec::with_capacity(returns.len() + 1);
    closes.push(100.0);
    for r in returns {
        let last = closes[closes.len() - 1];
        closes.push(last * (1.0 + r));
    }
    PriceSeries::from_closes(start(), &closes)
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_returns(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.08..0.08_f64, min..max)
}

fn arb_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1000.0_f64, 1..80)
}

// ── 1. Compounding identity ──────────────────────────────────────────

proptest! {
    #[test]
    fn period_return_matches_compounded_values(
        returns in arb_returns(2, 120),
        bench in arb_returns(120, 121),
    ) {
        let n = returns.len();
        let market = MarketData::new(prices_from_returns(&bench[..n]))
            .with_prices("AAPL", prices_from_returns(&returns));
        let snapshot = PortfolioSnapshot::new("SPY")
            .with_holding(Holding::new("AAPL", 10.0, 100.0));

        let result = compute_analytics(&snapshot, &market, Period::Max).unwrap();

        let values: Vec<ValuePoint> = result
            .history
            .iter()
            .map(|h| ValuePoint { date: h.date, value: h.portfolio_value })
            .collect();
        let from_values = total_return(&values);
        let expected = (returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0) * 100.0;

        prop_assert!((result.performance.period_return - from_values).abs() < 1e-6);
        prop_assert!((result.performance.period_return - expected).abs() < 1e-6);
    }
}

// ── 2. Correlation matrix ────────────────────────────────────────────

proptest! {
    #[test]
    fn correlation_matrix_is_symmetric_and_bounded(
        series in prop::collection::vec(arb_returns(10, 40), 1..6),
    ) {
        let named: Vec<(String, ReturnSeries)> = series
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("S{}", i), prices_from_returns(r).daily_returns()))
            .collect();

        let corr = correlation_matrix(&named, 20);

        for i in 0..named.len() {
            prop_assert_eq!(corr.matrix[i][i], 1.0);
            for j in 0..named.len() {
                prop_assert_eq!(corr.matrix[i][j], corr.matrix[j][i]);
                prop_assert!((-1.0..=1.0).contains(&corr.matrix[i][j]));
            }
        }
    }
}

// ── 3. Beta self-consistency ─────────────────────────────────────────

proptest! {
    #[test]
    fn beta_against_itself_is_one(returns in arb_returns(11, 100)) {
        let b = beta(&returns, &returns, 11);
        prop_assert!((b - 1.0).abs() < 1e-9);

        let series = prices_from_returns(&returns).daily_returns();
        let metrics = calculate_risk_metrics(&series, &series, &AnalyticsConfig::default());
        prop_assert!((metrics.beta - 1.0).abs() < 1e-9);
    }
}

// ── 4. Drawdown bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_is_bounded(values in arb_values()) {
        let points: Vec<ValuePoint> = PriceSeries::from_closes(start(), &values)
            .points()
            .iter()
            .map(|p| ValuePoint { date: p.date, value: p.close })
            .collect();

        let analysis = analyze_drawdowns(&points);

        prop_assert!(analysis.max_drawdown >= 0.0);
        prop_assert!(analysis.max_drawdown < 100.0);
        for point in &analysis.series {
            prop_assert!(point.drawdown <= 0.0);
            prop_assert!(-point.drawdown <= analysis.max_drawdown + 1e-9);
        }
        prop_assert!(analysis.current_drawdown <= 0.0);
        prop_assert!(-analysis.current_drawdown <= analysis.max_drawdown + 1e-9);
        prop_assert!(analysis.completed_periods <= analysis.periods.len());
    }
}

// ── 5. Zero-variance guard ───────────────────────────────────────────

proptest! {
    #[test]
    fn constant_prices_have_zero_ratios(price in 1.0..500.0_f64, n in 2usize..60) {
        let series = PriceSeries::from_closes(start(), &vec![price; n]).daily_returns();
        let metrics = calculate_risk_metrics(&series, &series, &AnalyticsConfig::default());

        prop_assert_eq!(metrics.volatility, 0.0);
        prop_assert_eq!(metrics.sharpe_ratio, 0.0);
        prop_assert_eq!(metrics.sortino_ratio, 0.0);
        prop_assert!(metrics.treynor_ratio.is_finite());
        prop_assert!(metrics.alpha.is_finite());
    }
}

//! Portfolio performance analytics.

use crate::market::MarketData;
use crate::series::AlignedSeries;
use crate::stats::{annualize_return, safe_div};
use crate::types::{Holding, PortfolioSnapshot, ReturnSeries, SecurityClass};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// A holding priced at its latest known price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingValuation {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    pub security_class: SecurityClass,
    pub shares: f64,
    /// Average cost per share
    pub cost_basis: f64,
    /// Latest price (quote first, then last historical price)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub market_value: f64,
    pub total_cost: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    /// Change in market value since the previous close
    pub day_change: f64,
    /// Share of total portfolio value (cash included), percent
    pub weight_percent: f64,
    /// Return over the analysed window, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_return: Option<f64>,
    pub has_price_data: bool,
}

impl HoldingValuation {
    fn from_holding(holding: &Holding, market: &MarketData) -> Self {
        let quote = market
            .quote_for(&holding.symbol)
            .filter(|q| q.price > 0.0 && q.price.is_finite());
        let history = market.prices_for(&holding.symbol);

        let price = quote
            .map(|q| q.price)
            .or_else(|| history.and_then(|h| h.latest_price()));

        let previous = match quote {
            Some(q) => (q.previous_close > 0.0).then_some(q.previous_close),
            None => history.and_then(|h| h.previous_price()),
        };

        let total_cost = holding.total_cost();
        let market_value = price.map(|p| p * holding.shares).unwrap_or(0.0);
        let gain_loss = if price.is_some() {
            market_value - total_cost
        } else {
            0.0
        };

        let day_change = match (price, previous) {
            (Some(p), Some(prev)) => (p - prev) * holding.shares,
            _ => 0.0,
        };

        Self {
            symbol: holding.symbol.clone(),
            sector: holding
                .sector
                .clone()
                .or_else(|| quote.and_then(|q| q.sector.clone())),
            security_class: holding.security_class,
            shares: holding.shares,
            cost_basis: holding.cost_basis,
            price,
            market_value,
            total_cost,
            gain_loss,
            gain_loss_percent: if price.is_some() {
                holding_period_return(total_cost, market_value)
            } else {
                0.0
            },
            day_change,
            weight_percent: 0.0,
            period_return: None,
            has_price_data: price.is_some(),
        }
    }
}

/// Price every holding of the snapshot and set its weight in total value.
pub fn value_holdings(snapshot: &PortfolioSnapshot, market: &MarketData) -> Vec<HoldingValuation> {
    let mut valuations: Vec<HoldingValuation> = snapshot
        .holdings
        .iter()
        .map(|h| HoldingValuation::from_holding(h, market))
        .collect();

    for v in valuations.iter().filter(|v| !v.has_price_data) {
        tracing::warn!(symbol = %v.symbol, "No price available; holding valued at zero");
    }

    let total_value: f64 =
        valuations.iter().map(|v| v.market_value).sum::<f64>() + snapshot.cash_balance;
    for v in &mut valuations {
        v.weight_percent = safe_div(v.market_value, total_value) * 100.0;
    }

    valuations
}

/// `(symbol, market value)` for every holding; unpriced holdings carry 0.
pub fn position_values(valuations: &[HoldingValuation]) -> Vec<(String, f64)> {
    valuations
        .iter()
        .map(|v| (v.symbol.clone(), v.market_value))
        .collect()
}

/// Copy each component's window return onto its valuation.
pub fn apply_period_returns(valuations: &mut [HoldingValuation], aligned: &AlignedSeries) {
    for v in valuations {
        v.period_return = aligned.component_return(&v.symbol);
    }
}

/// Current totals the performance summary is anchored to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CashFlowContext {
    /// Holdings plus cash
    pub total_value: f64,
    pub total_cost: f64,
    /// Latest-day change in holdings value
    pub day_change: f64,
}

impl CashFlowContext {
    pub fn from_valuations(valuations: &[HoldingValuation], cash: f64) -> Self {
        Self {
            total_value: valuations.iter().map(|v| v.market_value).sum::<f64>() + cash,
            total_cost: valuations.iter().map(|v| v.total_cost).sum(),
            day_change: valuations.iter().map(|v| v.day_change).sum(),
        }
    }
}

/// Portfolio performance summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    /// Holdings plus cash
    pub total_value: f64,
    /// Market value of holdings only
    pub invested_value: f64,
    pub cash: f64,
    /// Total cost basis of all positions
    pub total_cost: f64,
    /// Total unrealized gain/loss in dollars
    pub total_gain_loss: f64,
    /// Total unrealized gain/loss percentage
    pub total_gain_loss_percent: f64,
    pub day_change: f64,
    pub day_change_percent: f64,
    /// Compounded return over the window, percent
    pub period_return: f64,
    /// Compounded return since the last close of the previous calendar year,
    /// percent; independent of the selected period
    pub ytd_return: f64,
    pub annualized_return: f64,
    pub benchmark_return: f64,
    /// Period return minus benchmark return
    pub excess_return: f64,
    pub outperformed: bool,
    /// Number of positions
    pub position_count: usize,
    /// Number of positions with gains
    pub positions_in_profit: usize,
    /// Number of positions with losses
    pub positions_in_loss: usize,
}

impl PerformanceSummary {
    /// Calculate performance from valued holdings and the aligned series.
    ///
    /// `ytd` is the portfolio's year-to-date series, which may reach back
    /// before the window of `portfolio`. Period return fields stay at 0 when
    /// the portfolio has fewer than two daily returns.
    pub fn calculate(
        valuations: &[HoldingValuation],
        cash: f64,
        portfolio: &ReturnSeries,
        ytd: &ReturnSeries,
        benchmark: &ReturnSeries,
        trading_days_per_year: usize,
    ) -> Self {
        let context = CashFlowContext::from_valuations(valuations, cash);
        let invested_value = context.total_value - cash;
        let total_gain_loss = valuations.iter().map(|v| v.gain_loss).sum::<f64>();

        let previous_value = context.total_value - context.day_change;

        let mut summary = Self {
            total_value: context.total_value,
            invested_value,
            cash,
            total_cost: context.total_cost,
            total_gain_loss,
            total_gain_loss_percent: safe_div(total_gain_loss, context.total_cost) * 100.0,
            day_change: context.day_change,
            day_change_percent: safe_div(context.day_change, previous_value) * 100.0,
            position_count: valuations.len(),
            positions_in_profit: valuations.iter().filter(|v| v.gain_loss > 0.0).count(),
            positions_in_loss: valuations.iter().filter(|v| v.gain_loss < 0.0).count(),
            ..Default::default()
        };

        summary.ytd_return = ytd_return(ytd);
        if portfolio.len() >= 2 {
            summary.period_return = portfolio.compounded_return() * 100.0;
            summary.annualized_return =
                annualize_return(summary.period_return, portfolio.len(), trading_days_per_year);
            summary.benchmark_return = benchmark.compounded_return() * 100.0;
            summary.excess_return = summary.period_return - summary.benchmark_return;
            summary.outperformed = summary.excess_return > 0.0;
        }

        summary
    }
}

/// Compounded return of the returns dated in the calendar year of the last
/// observation, percent.
pub fn ytd_return(returns: &ReturnSeries) -> f64 {
    let Some(last) = returns.points.last() else {
        return 0.0;
    };
    let year = last.date.year();

    crate::stats::compound(
        returns
            .points
            .iter()
            .filter(|p| p.date.year() == year)
            .map(|p| p.daily_return),
    ) * 100.0
}

/// Calculate holding period return.
pub fn holding_period_return(initial_value: f64, final_value: f64) -> f64 {
    if initial_value <= 0.0 {
        return 0.0;
    }
    ((final_value - initial_value) / initial_value) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceSeries, Quote};
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn market() -> MarketData {
        let start = date(2024, 1, 2);
        MarketData::new(PriceSeries::from_closes(start, &[400.0, 404.0]))
            .with_prices("AAPL", PriceSeries::from_closes(start, &[170.0, 175.0]))
            .with_prices("GOOGL", PriceSeries::from_closes(start, &[95.0, 90.0]))
    }

    fn snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot::new("SPY")
            .with_holding(Holding::new("AAPL", 10.0, 150.0).with_sector("Technology"))
            .with_holding(Holding::new("GOOGL", 5.0, 100.0))
            .with_cash(1000.0)
    }

    #[test]
    fn test_portfolio_performance() {
        let valuations = value_holdings(&snapshot(), &market());
        let perf = PerformanceSummary::calculate(
            &valuations,
            1000.0,
            &ReturnSeries::default(),
            &ReturnSeries::default(),
            &ReturnSeries::default(),
            252,
        );

        assert_eq!(perf.total_cost, 2000.0); // 1500 + 500
        assert_eq!(perf.total_value, 3200.0); // 1750 + 450 + 1000 cash
        assert_eq!(perf.invested_value, 2200.0);
        assert_eq!(perf.total_gain_loss, 200.0); // (1750 - 1500) + (450 - 500)
        assert_abs_diff_eq!(perf.total_gain_loss_percent, 10.0, epsilon = 1e-9);
        assert_eq!(perf.position_count, 2);
        assert_eq!(perf.positions_in_profit, 1); // AAPL
        assert_eq!(perf.positions_in_loss, 1); // GOOGL
        assert_eq!(perf.period_return, 0.0);
    }

    #[test]
    fn test_day_change_from_history() {
        let valuations = value_holdings(&snapshot(), &market());
        // AAPL +5 * 10, GOOGL -5 * 5
        assert_abs_diff_eq!(valuations[0].day_change, 50.0);
        assert_abs_diff_eq!(valuations[1].day_change, -25.0);

        let context = CashFlowContext::from_valuations(&valuations, 1000.0);
        assert_abs_diff_eq!(context.day_change, 25.0);
    }

    #[test]
    fn test_quote_overrides_history() {
        let mut quote = Quote::new("AAPL", 180.0, 176.0);
        quote.sector = Some("Hardware".to_string());
        let market = market().with_quote(quote);
        let snapshot = PortfolioSnapshot::new("SPY").with_holding(Holding::new("AAPL", 10.0, 150.0));

        let valuations = value_holdings(&snapshot, &market);

        assert_eq!(valuations[0].price, Some(180.0));
        assert_abs_diff_eq!(valuations[0].market_value, 1800.0);
        assert_abs_diff_eq!(valuations[0].day_change, 40.0);
        assert_eq!(valuations[0].sector.as_deref(), Some("Hardware"));
    }

    #[test]
    fn test_position_weights_include_cash() {
        let valuations = value_holdings(&snapshot(), &market());
        let total: f64 = valuations.iter().map(|v| v.weight_percent).sum();

        // 2200 of 3200 is invested
        assert_abs_diff_eq!(total, 68.75, epsilon = 1e-9);
        assert_abs_diff_eq!(valuations[0].weight_percent, 1750.0 / 3200.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unpriced_holding() {
        let snapshot = snapshot().with_holding(Holding::new("MSFT", 3.0, 300.0));
        let valuations = value_holdings(&snapshot, &market());

        let msft = &valuations[2];
        assert!(!msft.has_price_data);
        assert_eq!(msft.market_value, 0.0);
        assert_eq!(msft.gain_loss, 0.0);
        assert_eq!(msft.gain_loss_percent, 0.0);

        let positions = position_values(&valuations);
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[2], ("MSFT".to_string(), 0.0));
    }

    #[test]
    fn test_return_metrics() {
        let dates = [date(2023, 12, 28), date(2023, 12, 29), date(2024, 1, 2), date(2024, 1, 3)];
        let portfolio = ReturnSeries::from_parts(&dates, &[0.01, 0.02, 0.10, -0.05]);
        let benchmark = ReturnSeries::from_parts(&dates, &[0.0, 0.0, 0.01, 0.01]);

        let perf = PerformanceSummary::calculate(&[], 100.0, &portfolio, &portfolio, &benchmark, 252);

        let expected = (1.01 * 1.02 * 1.10 * 0.95 - 1.0) * 100.0;
        assert_abs_diff_eq!(perf.period_return, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(perf.ytd_return, (1.10 * 0.95 - 1.0) * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(perf.benchmark_return, (1.01 * 1.01 - 1.0) * 100.0, epsilon = 1e-9);
        assert!(perf.outperformed);
        assert!(perf.annualized_return > perf.period_return);
    }

    #[test]
    fn test_ytd_reaches_before_window() {
        let window = ReturnSeries::from_parts(&[date(2024, 3, 1), date(2024, 3, 4)], &[0.01, 0.01]);
        let ytd = ReturnSeries::from_parts(
            &[date(2024, 1, 2), date(2024, 2, 1), date(2024, 3, 1), date(2024, 3, 4)],
            &[0.05, 0.05, 0.01, 0.01],
        );

        let perf =
            PerformanceSummary::calculate(&[], 0.0, &window, &ytd, &ReturnSeries::default(), 252);

        assert_abs_diff_eq!(perf.period_return, (1.01 * 1.01 - 1.0) * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            perf.ytd_return,
            (1.05 * 1.05 * 1.01 * 1.01 - 1.0) * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_holding_period_return() {
        let hpr = holding_period_return(10000.0, 11500.0);
        assert!((hpr - 15.0).abs() < 0.01);
        assert_eq!(holding_period_return(0.0, 100.0), 0.0);
    }
}

//! Market data consumed by the analytics engine.
//!
//! [`MarketData`] is the request-scoped bundle of price histories and
//! quotes. It can be supplied directly or gathered through a
//! [`MarketDataProvider`].

mod cache;
mod provider;

pub use cache::TimedCache;
pub use provider::{CachedProvider, MarketDataProvider, StaticProvider};

use crate::types::{PortfolioSnapshot, PriceSeries, Quote};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Price histories and quotes for one analytics request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketData {
    /// Daily history per holding symbol
    #[serde(default)]
    pub prices: HashMap<String, PriceSeries>,
    /// Daily history of the benchmark
    #[serde(default)]
    pub benchmark: PriceSeries,
    /// Current quotes per symbol
    #[serde(default)]
    pub quotes: HashMap<String, Quote>,
}

impl MarketData {
    pub fn new(benchmark: PriceSeries) -> Self {
        Self {
            benchmark,
            ..Default::default()
        }
    }

    pub fn with_prices(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.prices.insert(symbol.to_uppercase(), series);
        self
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.insert(quote.symbol.to_uppercase(), quote);
        self
    }

    /// History for `symbol`, matched case-insensitively.
    pub fn prices_for(&self, symbol: &str) -> Option<&PriceSeries> {
        lookup(&self.prices, symbol)
    }

    /// Quote for `symbol`, matched case-insensitively.
    pub fn quote_for(&self, symbol: &str) -> Option<&Quote> {
        lookup(&self.quotes, symbol)
    }

    /// Fetch histories and quotes for every holding plus the benchmark.
    ///
    /// A failed fetch is logged and the symbol left out; the engine then
    /// treats it as missing data.
    pub fn collect<P: MarketDataProvider>(
        provider: &P,
        snapshot: &PortfolioSnapshot,
        days: usize,
    ) -> Self {
        let benchmark = match provider.history(&snapshot.benchmark_symbol, days) {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(
                    symbol = %snapshot.benchmark_symbol,
                    error = %e,
                    "Failed to fetch benchmark history"
                );
                PriceSeries::default()
            }
        };

        let mut market = Self::new(benchmark);
        for holding in &snapshot.holdings {
            match provider.history(&holding.symbol, days) {
                Ok(series) => market = market.with_prices(&holding.symbol, series),
                Err(e) => {
                    tracing::warn!(symbol = %holding.symbol, error = %e, "Failed to fetch history")
                }
            }

            match provider.quote(&holding.symbol) {
                Ok(quote) => market = market.with_quote(quote),
                Err(e) => tracing::debug!(symbol = %holding.symbol, error = %e, "No quote available"),
            }
        }

        tracing::debug!(
            histories = market.prices.len(),
            quotes = market.quotes.len(),
            "Collected market data"
        );
        market
    }
}

fn lookup<'a, V>(map: &'a HashMap<String, V>, symbol: &str) -> Option<&'a V> {
    map.get(symbol).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(symbol))
            .map(|(_, value)| value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Holding;
    use chrono::NaiveDate;

    fn closes(values: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), values)
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut market = MarketData::new(closes(&[1.0, 2.0]));
        market.prices.insert("msft".to_string(), closes(&[3.0, 4.0]));
        let market = market.with_prices("aapl", closes(&[5.0, 6.0]));

        assert!(market.prices_for("AAPL").is_some());
        assert!(market.prices_for("MSFT").is_some());
        assert!(market.prices_for("GOOGL").is_none());
    }

    #[test]
    fn test_collect_skips_failed_symbols() {
        let provider = StaticProvider::new()
            .with_history("SPY", closes(&[400.0, 401.0, 402.0]))
            .with_history("AAPL", closes(&[170.0, 171.0, 172.0]))
            .with_quote(Quote::new("AAPL", 172.5, 172.0));
        let snapshot = PortfolioSnapshot::new("SPY")
            .with_holding(Holding::new("AAPL", 1.0, 100.0))
            .with_holding(Holding::new("GONE", 1.0, 100.0));

        let market = MarketData::collect(&provider, &snapshot, 252);

        assert_eq!(market.benchmark.len(), 3);
        assert_eq!(market.prices.len(), 1);
        assert!(market.prices_for("GONE").is_none());
        assert_eq!(market.quote_for("AAPL").map(|q| q.price), Some(172.5));
    }

    #[test]
    fn test_collect_without_benchmark() {
        let provider = StaticProvider::new().with_history("AAPL", closes(&[1.0, 2.0]));
        let snapshot = PortfolioSnapshot::new("SPY").with_holding(Holding::new("AAPL", 1.0, 1.0));

        let market = MarketData::collect(&provider, &snapshot, 10);
        assert!(market.benchmark.is_empty());
        assert_eq!(market.prices.len(), 1);
    }

    #[test]
    fn test_deserialize_request_shape() {
        let json = r#"{
            "prices": {"AAPL": [{"date": "2024-01-02", "close": 170.0}]},
            "benchmark": [{"date": "2024-01-02", "close": 400.0, "adjusted_close": 398.0}]
        }"#;
        let market: MarketData = serde_json::from_str(json).unwrap();

        assert_eq!(market.prices_for("aapl").unwrap().len(), 1);
        assert_eq!(market.benchmark.latest_price(), Some(398.0));
        assert!(market.quotes.is_empty());
    }
}

//! Core data types for the WealthPilot analytics engine.

use crate::Error;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// One trading day of prices for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    /// Raw close
    pub close: f64,
    /// Dividend/split-adjusted close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_close: Option<f64>,
    #[serde(default)]
    pub volume: u64,
}

impl PricePoint {
    /// Create a point where every price field equals `close`.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            adjusted_close: None,
            volume: 0,
        }
    }

    /// Set the adjusted close.
    pub fn with_adjusted_close(mut self, adjusted_close: f64) -> Self {
        self.adjusted_close = Some(adjusted_close);
        self
    }

    /// Price used for return math: the adjusted close when it is positive,
    /// otherwise the raw close.
    pub fn price(&self) -> f64 {
        match self.adjusted_close {
            Some(adj) if adj > 0.0 && adj.is_finite() => adj,
            _ => self.close,
        }
    }
}

/// Ordered price history for one symbol.
///
/// Points are kept sorted by date with duplicate dates and non-positive
/// prices removed, so `date` is strictly increasing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from unordered points.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.price() > 0.0 && p.price().is_finite());
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    /// Build a series of closes on consecutive weekdays starting at `start`.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let mut date = start;
        while is_weekend(date) {
            date += Duration::days(1);
        }

        let mut points = Vec::with_capacity(closes.len());
        for &close in closes {
            points.push(PricePoint::new(date, close));
            date = next_weekday(date);
        }
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Most recent price.
    pub fn latest_price(&self) -> Option<f64> {
        self.points.last().map(PricePoint::price)
    }

    /// Price of the trading day before the most recent one.
    pub fn previous_price(&self) -> Option<f64> {
        self.points.len().checked_sub(2).map(|i| self.points[i].price())
    }

    /// Daily simple returns, one per point after the first.
    pub fn daily_returns(&self) -> ReturnSeries {
        let points = self
            .points
            .windows(2)
            .map(|w| ReturnPoint {
                date: w[1].date,
                daily_return: (w[1].price() - w[0].price()) / w[0].price(),
            })
            .collect();
        ReturnSeries { points }
    }
}

impl From<Vec<PricePoint>> for PriceSeries {
    fn from(points: Vec<PricePoint>) -> Self {
        Self::new(points)
    }
}

impl From<PriceSeries> for Vec<PricePoint> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while is_weekend(next) {
        next += Duration::days(1);
    }
    next
}

/// One daily return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    /// `(P_t - P_{t-1}) / P_{t-1}` as a decimal
    pub daily_return: f64,
}

/// Ordered daily return series.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ReturnSeries {
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    /// Pair dates with returns; extra entries on either side are dropped.
    pub fn from_parts(dates: &[NaiveDate], returns: &[f64]) -> Self {
        let points = dates
            .iter()
            .zip(returns)
            .map(|(&date, &daily_return)| ReturnPoint { date, daily_return })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.daily_return).collect()
    }

    /// `prod(1 + r) - 1` as a decimal.
    pub fn compounded_return(&self) -> f64 {
        crate::stats::compound(self.points.iter().map(|p| p.daily_return))
    }

    /// Inner join on date. Both series must be sorted by date.
    pub fn join(&self, other: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < self.points.len() && j < other.points.len() {
            let (a, b) = (&self.points[i], &other.points[j]);
            match a.date.cmp(&b.date) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    left.push(a.daily_return);
                    right.push(b.daily_return);
                    i += 1;
                    j += 1;
                }
            }
        }

        (left, right)
    }
}

/// A dated value (portfolio value, growth index, rebased benchmark).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Closed set of security classes a holding can belong to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SecurityClass {
    #[default]
    Stock,
    Reit,
    MortgageReit,
    Etf,
    ClosedEndFund,
    MutualFund,
    Crypto,
    PreferredStock,
}

/// A position held in the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    /// Number of shares held
    pub shares: f64,
    /// Average cost per share
    pub cost_basis: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default)]
    pub security_class: SecurityClass,
}

impl Holding {
    /// Create a holding with the given symbol, shares, and cost per share.
    pub fn new(symbol: &str, shares: f64, cost_basis: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            shares,
            cost_basis,
            sector: None,
            security_class: SecurityClass::default(),
        }
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_class(mut self, class: SecurityClass) -> Self {
        self.security_class = class;
        self
    }

    /// Total cost of this holding.
    pub fn total_cost(&self) -> f64 {
        self.shares * self.cost_basis
    }
}

/// Immutable portfolio input for one analytics run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub cash_balance: f64,
    #[serde(default = "default_benchmark")]
    pub benchmark_symbol: String,
}

fn default_benchmark() -> String {
    "SPY".to_string()
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self::new(&default_benchmark())
    }
}

impl PortfolioSnapshot {
    /// Create an empty snapshot measured against `benchmark_symbol`.
    pub fn new(benchmark_symbol: &str) -> Self {
        Self {
            holdings: Vec::new(),
            cash_balance: 0.0,
            benchmark_symbol: benchmark_symbol.to_uppercase(),
        }
    }

    pub fn with_holding(mut self, holding: Holding) -> Self {
        self.holdings.push(holding);
        self
    }

    pub fn with_cash(mut self, cash: f64) -> Self {
        self.cash_balance = cash;
        self
    }

    /// Total cost basis of all holdings.
    pub fn total_cost(&self) -> f64 {
        self.holdings.iter().map(Holding::total_cost).sum()
    }

    /// Reject structurally invalid snapshots before any computation runs.
    pub fn validate(&self) -> crate::Result<()> {
        if self.holdings.is_empty() && self.cash_balance <= 0.0 {
            return Err(Error::InvalidInput(
                "Portfolio has no holdings and no cash".to_string(),
            ));
        }

        if !self.cash_balance.is_finite() || self.cash_balance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Cash balance must be a non-negative number, got {}",
                self.cash_balance
            )));
        }

        let mut seen = HashSet::new();
        for holding in &self.holdings {
            let symbol = holding.symbol.trim().to_uppercase();
            if symbol.is_empty() {
                return Err(Error::InvalidInput("Holding with empty symbol".to_string()));
            }
            if !holding.shares.is_finite() || holding.shares < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "{}: shares must be non-negative",
                    symbol
                )));
            }
            if !holding.cost_basis.is_finite() || holding.cost_basis < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "{}: cost basis must be non-negative",
                    symbol
                )));
            }
            if !seen.insert(symbol.clone()) {
                return Err(Error::InvalidInput(format!("Duplicate holding: {}", symbol)));
            }
        }

        Ok(())
    }
}

/// Current quote supplied by the market data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl Quote {
    pub fn new(symbol: &str, price: f64, previous_close: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price,
            previous_close,
            beta: None,
            dividend_yield: None,
            name: None,
            sector: None,
        }
    }

    /// Absolute change since the previous close.
    pub fn change(&self) -> f64 {
        self.price - self.previous_close
    }
}

/// Lookback window for an analytics run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Period {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "ytd")]
    YearToDate,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "3y")]
    ThreeYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::YearToDate,
        Period::OneYear,
        Period::ThreeYears,
        Period::FiveYears,
        Period::Max,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::OneMonth => "1m",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::YearToDate => "ytd",
            Period::OneYear => "1y",
            Period::ThreeYears => "3y",
            Period::FiveYears => "5y",
            Period::Max => "max",
        }
    }

    /// Number of daily returns covered, for fixed-length periods.
    pub fn trading_days(&self) -> Option<usize> {
        match self {
            Period::OneMonth => Some(21),
            Period::ThreeMonths => Some(63),
            Period::SixMonths => Some(126),
            Period::OneYear => Some(252),
            Period::ThreeYears => Some(756),
            Period::FiveYears => Some(1260),
            Period::YearToDate | Period::Max => None,
        }
    }

    /// Index of the first date (the return base) inside the window.
    ///
    /// Year-to-date starts from the last trading day of the prior year so
    /// the first trading day of the year contributes a return.
    pub fn window_start(&self, dates: &[NaiveDate]) -> usize {
        let Some(last) = dates.last() else {
            return 0;
        };

        match self {
            Period::Max => 0,
            Period::YearToDate => dates
                .iter()
                .rposition(|d| d.year() < last.year())
                .unwrap_or(0),
            fixed => fixed
                .trading_days()
                .map(|days| dates.len().saturating_sub(days + 1))
                .unwrap_or(0),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.label() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown period: {}", s)))
    }
}

/// API response wrapper used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

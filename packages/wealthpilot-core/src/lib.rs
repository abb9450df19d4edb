//! WealthPilot Core - Portfolio performance and risk analytics.
//!
//! This crate turns historical prices and a portfolio snapshot into the
//! metrics shown on the WealthPilot dashboard:
//!
//! - **Return series**: date-aligned, fixed-current-weight portfolio and benchmark returns
//! - **Risk metrics**: volatility, Sharpe, Sortino, Calmar, Treynor, beta/alpha, VaR
//! - **Drawdown**: peak tracking with drawdown periods and recovery times
//! - **Periodic returns**: rolling annualized returns, monthly heatmap, annual returns
//! - **Correlation**: pairwise Pearson matrix over holdings and benchmark
//! - **Attribution**: sector contribution and heuristic factor exposures
//!
//! # Example
//!
//! ```rust,no_run
//! use wealthpilot_core::{compute_analytics, Holding, MarketData, Period, PortfolioSnapshot};
//!
//! let snapshot = PortfolioSnapshot::new("SPY")
//!     .with_holding(Holding::new("AAPL", 10.0, 150.0).with_sector("Technology"))
//!     .with_cash(2_500.0);
//!
//! // Price histories come from a market data provider.
//! let market = MarketData::default();
//!
//! let result = compute_analytics(&snapshot, &market, Period::OneYear)?;
//! println!("Sharpe: {:.2}", result.risk.sharpe_ratio);
//! # Ok::<(), wealthpilot_core::Error>(())
//! ```

pub mod analytics;
pub mod config;
pub mod market;
pub mod portfolio;
pub mod series;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use analytics::{compute_analytics, AnalyticsEngine, AnalyticsRequest, HistoryPoint, MetricsResult};
pub use config::AnalyticsConfig;
pub use market::{CachedProvider, MarketData, MarketDataProvider, StaticProvider, TimedCache};
pub use types::{
    ApiResponse, Holding, Period, PortfolioSnapshot, PricePoint, PriceSeries, Quote, ReturnPoint,
    ReturnSeries, SecurityClass, ValuePoint,
};

// Re-export main functionality
pub use portfolio::{
    analyze_drawdowns, calculate_risk_metrics, correlation_matrix, heuristic_factor_exposures,
    sector_attribution, Attribution, CorrelationMatrix, DrawdownAnalysis, FactorExposures,
    HoldingValuation, PerformanceSummary, RiskMetrics,
};
pub use series::{build_return_series, periodic_returns, AlignedSeries, PeriodicReturns, WeightingStrategy};

/// Error types for wealthpilot-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing data for symbol: {0}")]
    MissingSymbolData(String),
}

/// Result type for wealthpilot-core operations.
pub type Result<T> = std::result::Result<T, Error>;

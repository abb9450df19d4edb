//! Return series construction and periodic aggregation.
//!
//! Builds aligned portfolio/benchmark return series and derives rolling,
//! monthly and annual returns from the resulting value series.

mod builder;
mod periodic;

pub use builder::{build_return_series, AlignedSeries, ComponentSeries, WeightingStrategy};
pub use periodic::{
    annual_returns, monthly_heatmap, periodic_returns, rolling_returns, total_return, AnnualReturn,
    MonthlyHeatmap, MonthlyReturn, PeriodicReturns, RollingPoint, RollingReturns,
};

//! Portfolio analytics module.
//!
//! Provides holding valuation, performance, risk metrics, drawdown
//! tracking, correlation and attribution.

mod attribution;
mod correlation;
mod drawdown;
mod performance;
mod risk;

pub use attribution::{
    class_allocation, heuristic_factor_exposures, sector_attribution, Attribution, ClassAllocation,
    Factor, FactorExposure, FactorExposures, FactorModelKind, SectorAttribution, UNKNOWN_SECTOR,
};
pub use correlation::{correlation_matrix, pair_correlation, CorrelationMatrix};
pub use drawdown::{
    analyze_drawdowns, max_drawdown, DrawdownAnalysis, DrawdownPeriod, DrawdownPoint,
    DrawdownTracker, TrackedPeriod,
};
pub use performance::{
    apply_period_returns, holding_period_return, position_values, value_holdings, ytd_return,
    CashFlowContext, HoldingValuation, PerformanceSummary,
};
pub use risk::{beta, calculate_risk_metrics, norm_ppf, sharpe_ratio, volatility, RiskMetrics};

//! Portfolio risk metrics calculation.
//!
//! Provides volatility, Sharpe/Sortino/Calmar/Treynor ratios, beta/alpha,
//! tracking error, VaR and CVaR from daily simple returns.

use super::drawdown::max_drawdown;
use crate::config::AnalyticsConfig;
use crate::stats::{
    annualize_return, compound, covariance, finite_or_zero, lower_quantile, mean, pearson, safe_div,
    sample_std, sample_variance, EPSILON,
};
use crate::types::ReturnSeries;
use serde::{Deserialize, Serialize};

/// Risk metrics for a portfolio.
///
/// Percent-valued fields are already multiplied by 100. A record built from
/// fewer than two returns is all zeros (see [`RiskMetrics::default`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskMetrics {
    /// Number of daily returns the metrics were computed from
    pub observations: usize,
    /// Annualized volatility percentage
    pub volatility: f64,
    /// Annualized volatility of negative days only
    pub downside_volatility: f64,
    /// Sharpe ratio (annualized risk-adjusted return)
    pub sharpe_ratio: f64,
    /// Sortino ratio (downside risk-adjusted return)
    pub sortino_ratio: f64,
    /// Annualized return over max drawdown
    pub calmar_ratio: f64,
    /// Annualized excess return per unit of beta
    pub treynor_ratio: f64,
    /// Active return per unit of tracking error
    pub information_ratio: f64,
    /// Maximum drawdown percentage (positive)
    pub max_drawdown: f64,
    pub beta: f64,
    /// Annualized Jensen's alpha, percent
    pub alpha: f64,
    pub r_squared: f64,
    /// Annualized tracking error percentage
    pub tracking_error: f64,
    /// Confidence level used for VaR (e.g., 0.95 for 95%)
    pub confidence_level: f64,
    /// Historical daily VaR, percent (signed; losses are negative)
    pub var: f64,
    /// Mean of the returns at or below the VaR cutoff, percent
    pub cvar: f64,
    /// Normal-distribution daily VaR, percent
    pub parametric_var: f64,
    /// Percentage of days with a positive return
    pub win_rate: f64,
    pub best_day: f64,
    pub worst_day: f64,
}

/// Calculate risk metrics for a portfolio against its benchmark.
///
/// # Arguments
///
/// * `portfolio` - Daily portfolio returns
/// * `benchmark` - Daily benchmark returns; paired with the portfolio by date
/// * `config` - Risk-free rate, annualization and VaR settings
///
/// # Returns
///
/// `RiskMetrics::default()` when fewer than two returns are available.
/// Ratios whose denominator is zero are reported as 0.
pub fn calculate_risk_metrics(
    portfolio: &ReturnSeries,
    benchmark: &ReturnSeries,
    config: &AnalyticsConfig,
) -> RiskMetrics {
    let returns = portfolio.values();
    if returns.len() < 2 {
        return RiskMetrics::default();
    }

    let n = returns.len();
    let trading_days = config.trading_days_per_year as f64;
    let sqrt_days = config.annualization_factor();
    let daily_rf = config.daily_risk_free_rate();

    let mean_return = mean(&returns);
    let volatility = volatility(&returns, sqrt_days);

    // Downside volatility
    let downside: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
    let downside_volatility = sample_std(&downside) * sqrt_days * 100.0;

    let sharpe = sharpe_ratio(&returns, daily_rf, sqrt_days);

    let period_return = compound(returns.iter().copied()) * 100.0;
    let annualized = annualize_return(period_return, n, config.trading_days_per_year);
    let sortino = safe_div(annualized - config.risk_free_rate * 100.0, downside_volatility);

    // Max drawdown on the compounded index, starting from 1.0
    let mut index = Vec::with_capacity(n + 1);
    index.push(1.0);
    for r in &returns {
        index.push(index[index.len() - 1] * (1.0 + r));
    }
    let max_dd = max_drawdown(&index) * 100.0;
    let calmar = safe_div(annualized, max_dd);

    // Benchmark-relative statistics on the date-paired window
    let (paired, bench) = portfolio.join(benchmark);
    let beta = beta(&paired, &bench, config.min_beta_observations);

    let alpha = if paired.len() >= 2 {
        finite_or_zero(
            (mean(&paired) - daily_rf - beta * (mean(&bench) - daily_rf)) * trading_days * 100.0,
        )
    } else {
        0.0
    };

    let r_squared = pearson(&paired, &bench).map(|r| r * r).unwrap_or(0.0);

    let active: Vec<f64> = paired.iter().zip(&bench).map(|(p, b)| p - b).collect();
    let tracking_error = sample_std(&active) * sqrt_days * 100.0;

    let treynor = if beta.abs() < 1e-6 {
        0.0
    } else {
        finite_or_zero((mean_return - daily_rf) * trading_days * 100.0 / beta)
    };

    let benchmark_return = benchmark.compounded_return() * 100.0;
    let information_ratio = safe_div(period_return - benchmark_return, tracking_error);

    // Value at Risk
    let tail = 1.0 - config.var_confidence;
    let var = lower_quantile(&returns, tail);
    let cvar = conditional_var(&returns, tail).unwrap_or(var);
    let parametric_var = mean_return + norm_ppf(tail) * sample_std(&returns);

    let wins = returns.iter().filter(|&&r| r > 0.0).count();
    let best_day = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst_day = returns.iter().copied().fold(f64::INFINITY, f64::min);

    RiskMetrics {
        observations: n,
        volatility,
        downside_volatility,
        sharpe_ratio: sharpe,
        sortino_ratio: sortino,
        calmar_ratio: calmar,
        treynor_ratio: treynor,
        information_ratio,
        max_drawdown: max_dd,
        beta,
        alpha,
        r_squared,
        tracking_error,
        confidence_level: config.var_confidence,
        var: var * 100.0,
        cvar: cvar * 100.0,
        parametric_var: finite_or_zero(parametric_var * 100.0),
        win_rate: wins as f64 / n as f64 * 100.0,
        best_day: best_day * 100.0,
        worst_day: worst_day * 100.0,
    }
}

/// Annualized volatility percentage (sample standard deviation).
pub fn volatility(returns: &[f64], annualization_factor: f64) -> f64 {
    sample_std(returns) * annualization_factor * 100.0
}

/// Annualized Sharpe ratio; 0 when returns have no variance.
pub fn sharpe_ratio(returns: &[f64], daily_risk_free_rate: f64, annualization_factor: f64) -> f64 {
    let std = sample_std(returns);
    safe_div(mean(returns) - daily_risk_free_rate, std) * annualization_factor
}

/// Regression slope of `portfolio` on `benchmark`.
///
/// Falls back to 1.0 (market-neutral assumption) when fewer than
/// `min_observations` pairs exist or the benchmark has no variance.
pub fn beta(portfolio: &[f64], benchmark: &[f64], min_observations: usize) -> f64 {
    let n = portfolio.len().min(benchmark.len());
    if n < min_observations.max(2) {
        return 1.0;
    }

    let var_b = sample_variance(&benchmark[..n]);
    if var_b < EPSILON {
        return 1.0;
    }

    let beta = covariance(&portfolio[..n], &benchmark[..n]) / var_b;
    if beta.is_finite() {
        beta
    } else {
        1.0
    }
}

/// Mean of the worst `floor(tail * n)` returns, `None` when that count is 0.
fn conditional_var(returns: &[f64], tail: f64) -> Option<f64> {
    let count = (tail * returns.len() as f64) as usize;
    if count == 0 {
        return None;
    }

    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(mean(&sorted[..count]))
}

/// Inverse cumulative distribution function for standard normal distribution.
///
/// Uses Acklam's algorithm for high accuracy across the full range.
/// Source: https://web.archive.org/web/20151110174102/http://home.online.no/~pjacklam/notes/invnorm/
pub fn norm_ppf(p: f64) -> f64 {
    // Coefficients in rational approximations
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];

    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];

    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];

    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

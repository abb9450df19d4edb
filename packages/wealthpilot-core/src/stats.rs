//! Descriptive statistics shared by the metric calculators.
//!
//! Every function here is total: short or degenerate input yields `0.0`
//! (or `None` where the caller needs to tell "undefined" apart).

/// Denominators smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-12;

/// Arithmetic mean, `0.0` for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator), `0.0` for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation.
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Sample covariance over the common prefix of `xs` and `ys`.
pub fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));

    xs.iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Pearson correlation, clamped to `[-1, 1]`.
///
/// Returns `None` when either side has no variance or fewer than two
/// paired observations exist.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < EPSILON || var_y < EPSILON {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Value at the lower `tail` quantile of `values` (e.g. `0.05` for the 5th
/// percentile), using index `floor(tail * n)` of the ascending sort.
pub fn lower_quantile(values: &[f64], tail: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let idx = ((tail.clamp(0.0, 1.0) * sorted.len() as f64) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// `prod(1 + r) - 1` as a decimal.
pub fn compound<I>(returns: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    returns.into_iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Annualize a percentage return earned over `periods` observations.
pub fn annualize_return(return_pct: f64, periods: usize, periods_per_year: usize) -> f64 {
    if periods == 0 || periods_per_year == 0 {
        return 0.0;
    }

    let years = periods as f64 / periods_per_year as f64;
    let growth = 1.0 + (return_pct / 100.0);
    if growth <= 0.0 {
        return -100.0;
    }

    finite_or_zero((growth.powf(1.0 / years) - 1.0) * 100.0)
}

/// `numerator / denominator`, or `0.0` when the denominator is ~0 or the
/// result is not finite.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

/// `value`, or `0.0` when it is NaN or infinite.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_and_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(mean(&values), 5.0);
        // Sum of squared deviations is 32, n - 1 = 7
        assert_abs_diff_eq!(sample_variance(&values), 32.0 / 7.0, epsilon = 1e-12);
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_covariance_with_itself_is_variance() {
        let values = [0.01, -0.02, 0.015, 0.003, -0.007];
        assert_abs_diff_eq!(covariance(&values, &values), sample_variance(&values), epsilon = 1e-15);
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let z = [8.0, 6.0, 4.0, 2.0];

        assert_abs_diff_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson(&x, &z).unwrap(), -1.0, epsilon = 1e-12);
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_none());
        assert!(pearson(&[1.0], &[2.0]).is_none());
    }

    #[test]
    fn test_lower_quantile() {
        let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        assert_eq!(lower_quantile(&values, 0.05), 6.0);
        assert_eq!(lower_quantile(&[3.0, 1.0, 2.0], 0.05), 1.0);
        assert_eq!(lower_quantile(&[], 0.05), 0.0);
    }

    #[test]
    fn test_compound() {
        assert_abs_diff_eq!(compound([0.10, -0.10]), -0.01, epsilon = 1e-12);
        assert_eq!(compound(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_annualize_return() {
        // 10% return over 6 months (half year)
        let annualized = annualize_return(10.0, 6, 12);

        // (1.10)^2 - 1 = 21%
        assert_abs_diff_eq!(annualized, 21.0, epsilon = 1e-9);
        assert_eq!(annualize_return(10.0, 0, 252), 0.0);
        assert_eq!(annualize_return(-100.0, 10, 252), -100.0);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 0.0), 0.0);
        assert_eq!(safe_div(1.0, 1e-15), 0.0);
        assert_eq!(safe_div(f64::INFINITY, 1.0), 0.0);
        assert_eq!(safe_div(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
        assert_eq!(finite_or_zero(-2.5), -2.5);
    }
}

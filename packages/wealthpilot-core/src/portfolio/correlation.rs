//! Pairwise correlation of return series.
//!
//! Series may cover different dates; each pair is inner-joined on date
//! before the Pearson coefficient is computed.

use crate::stats::pearson;
use crate::types::ReturnSeries;
use serde::{Deserialize, Serialize};

/// Correlation matrix result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorrelationMatrix {
    /// Row/column order
    pub symbols: Vec<String>,
    /// N×N matrix, entries in `[-1, 1]`, diagonal 1.0
    pub matrix: Vec<Vec<f64>>,
    /// Aligned observations a pair needed to get a non-zero entry
    pub min_observations: usize,
    /// Mean of the off-diagonal entries
    pub average_correlation: f64,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Entry at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.matrix.get(i).and_then(|row| row.get(j)).copied()
    }

    /// Entry for a pair of symbols.
    pub fn value(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        self.get(i, j)
    }

    fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s.eq_ignore_ascii_case(symbol))
    }
}

/// Correlation of two series over their common dates.
///
/// 0 when fewer than `min_observations` dates are shared or either side
/// has no variance.
pub fn pair_correlation(a: &ReturnSeries, b: &ReturnSeries, min_observations: usize) -> f64 {
    let (xs, ys) = a.join(b);
    if xs.len() < min_observations {
        return 0.0;
    }
    pearson(&xs, &ys).unwrap_or(0.0)
}

/// Build the correlation matrix of `series`.
///
/// Only the upper triangle is computed; the lower triangle is its mirror.
pub fn correlation_matrix(series: &[(String, ReturnSeries)], min_observations: usize) -> CorrelationMatrix {
    let n = series.len();
    let mut matrix = vec![vec![0.0; n]; n];
    let mut off_diagonal = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let corr = pair_correlation(&series[i].1, &series[j].1, min_observations);
            matrix[i][j] = corr;
            matrix[j][i] = corr;
            off_diagonal.push(corr);
        }
    }

    let average_correlation = if off_diagonal.is_empty() {
        0.0
    } else {
        off_diagonal.iter().sum::<f64>() / off_diagonal.len() as f64
    };

    tracing::debug!(symbols = n, "Computed correlation matrix");

    CorrelationMatrix {
        symbols: series.iter().map(|(s, _)| s.clone()).collect(),
        matrix,
        min_observations,
        average_correlation,
    }
}

//! Drawdown and recovery tracking.
//!
//! A drawdown period opens when the value falls below the running peak and
//! closes when the value gets back to that peak.

use crate::types::ValuePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Drawdown at one date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    /// Decline from the running peak, percent (always <= 0)
    pub drawdown: f64,
}

/// A peak-to-recovery episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawdownPeriod {
    /// Date of the peak the decline started from
    pub peak_date: NaiveDate,
    /// Date of the lowest value
    pub trough_date: NaiveDate,
    /// Date the value got back to the peak, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_date: Option<NaiveDate>,
    /// Deepest decline, percent (positive)
    pub depth: f64,
    /// Periods from peak to recovery (or to the last observation)
    pub duration_periods: usize,
    /// Periods from trough to recovery, if recovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_periods: Option<usize>,
}

impl DrawdownPeriod {
    pub fn is_recovered(&self) -> bool {
        self.recovery_date.is_some()
    }
}

/// Full drawdown analysis of a value series.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DrawdownAnalysis {
    pub series: Vec<DrawdownPoint>,
    /// Largest decline, percent (positive)
    pub max_drawdown: f64,
    /// Decline at the last observation, percent (<= 0)
    pub current_drawdown: f64,
    /// Every period, in chronological order; the last may still be open
    pub periods: Vec<DrawdownPeriod>,
    /// Number of periods that recovered inside the window
    pub completed_periods: usize,
    /// Mean trough-to-recovery span of completed periods; open periods are
    /// not counted
    pub average_recovery_periods: f64,
}

/// Index-based period produced by [`DrawdownTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPeriod {
    pub peak_index: usize,
    pub trough_index: usize,
    pub recovery_index: Option<usize>,
    /// Decimal
    pub depth: f64,
}

/// Peak-tracking state machine fed one value at a time.
#[derive(Debug, Clone, Default)]
pub struct DrawdownTracker {
    peak: Option<f64>,
    peak_index: usize,
    open: Option<TrackedPeriod>,
    closed: Vec<TrackedPeriod>,
    max_drawdown: f64,
    current_drawdown: f64,
    observed: usize,
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next value and return its drawdown as a decimal (>= 0).
    pub fn observe(&mut self, value: f64) -> f64 {
        let index = self.observed;
        self.observed += 1;

        let peak = match self.peak {
            Some(peak) => peak,
            None => {
                self.peak = Some(value);
                self.peak_index = index;
                return 0.0;
            }
        };

        if value >= peak {
            if let Some(mut period) = self.open.take() {
                period.recovery_index = Some(index);
                self.closed.push(period);
            }
            self.peak = Some(value);
            self.peak_index = index;
            self.current_drawdown = 0.0;
            return 0.0;
        }

        let drawdown = if peak > 0.0 { (peak - value) / peak } else { 0.0 };
        match self.open.as_mut() {
            Some(period) => {
                if drawdown > period.depth {
                    period.depth = drawdown;
                    period.trough_index = index;
                }
            }
            None => {
                self.open = Some(TrackedPeriod {
                    peak_index: self.peak_index,
                    trough_index: index,
                    recovery_index: None,
                    depth: drawdown,
                });
            }
        }

        self.max_drawdown = self.max_drawdown.max(drawdown);
        self.current_drawdown = drawdown;
        drawdown
    }

    /// Largest drawdown seen so far, decimal.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Drawdown at the last observation, decimal.
    pub fn current_drawdown(&self) -> f64 {
        self.current_drawdown
    }

    /// Number of values observed.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// All periods in chronological order, including one still open.
    pub fn into_periods(self) -> Vec<TrackedPeriod> {
        let mut periods = self.closed;
        periods.extend(self.open);
        periods
    }
}

/// Maximum peak-to-trough decline of `values`, as a decimal.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut tracker = DrawdownTracker::new();
    for &value in values {
        tracker.observe(value);
    }
    tracker.max_drawdown()
}

/// Run the tracker over a dated value series.
pub fn analyze_drawdowns(values: &[ValuePoint]) -> DrawdownAnalysis {
    if values.is_empty() {
        return DrawdownAnalysis::default();
    }

    let mut tracker = DrawdownTracker::new();
    let series = values
        .iter()
        .map(|point| DrawdownPoint {
            date: point.date,
            drawdown: as_negative_percent(tracker.observe(point.value)),
        })
        .collect();

    let max_drawdown = tracker.max_drawdown() * 100.0;
    let current_drawdown = as_negative_percent(tracker.current_drawdown());
    let last_index = tracker.observed() - 1;

    let periods: Vec<DrawdownPeriod> = tracker
        .into_periods()
        .into_iter()
        .map(|p| DrawdownPeriod {
            peak_date: values[p.peak_index].date,
            trough_date: values[p.trough_index].date,
            recovery_date: p.recovery_index.map(|i| values[i].date),
            depth: p.depth * 100.0,
            duration_periods: p.recovery_index.unwrap_or(last_index) - p.peak_index,
            recovery_periods: p.recovery_index.map(|i| i - p.trough_index),
        })
        .collect();

    let recoveries: Vec<usize> = periods.iter().filter_map(|p| p.recovery_periods).collect();
    let average_recovery_periods = if recoveries.is_empty() {
        0.0
    } else {
        recoveries.iter().sum::<usize>() as f64 / recoveries.len() as f64
    };

    DrawdownAnalysis {
        series,
        max_drawdown,
        current_drawdown,
        completed_periods: recoveries.len(),
        average_recovery_periods,
        periods,
    }
}

fn as_negative_percent(drawdown: f64) -> f64 {
    if drawdown > 0.0 {
        -drawdown * 100.0
    } else {
        0.0
    }
}

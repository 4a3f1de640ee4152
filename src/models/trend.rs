//! Piecewise-linear trend with changepoints.
//!
//! With time scaled to `t ∈ [0, 1]` over the history, the trend is:
//!
//! ```text
//! g(t) = k t + m + Σ_j δ_j (t - s_j)^+
//! ```
//!
//! i.e. the slope starts at `k` and changes by `δ_j` at each changepoint `s_j`,
//! while the offset adjusts so the curve stays continuous. Past the last
//! observation the final slope simply continues.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Mapping from calendar dates to scaled time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub start: NaiveDate,
    /// Days between the first and last history date (1 when they coincide).
    pub span_days: f64,
}

impl TimeScale {
    /// Build from the first and last history dates.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let span = (end - start).num_days() as f64;
        Self {
            start,
            span_days: if span > 0.0 { span } else { 1.0 },
        }
    }

    pub fn t(&self, ds: NaiveDate) -> f64 {
        (ds - self.start).num_days() as f64 / self.span_days
    }
}

/// Select changepoint dates from a date-sorted history.
///
/// Candidates are restricted to the first `range` fraction of the history. When
/// the history is short, the number of changepoints shrinks so that each one
/// sits on a distinct observation: with `hist = floor(n * range)`, at most
/// `hist - 1` changepoints are used. Positions are spread evenly over
/// `[0, hist - 1]` and the first one (the start of history) is dropped.
pub fn select_changepoints(sorted_dates: &[NaiveDate], n_changepoints: usize, range: f64) -> Vec<NaiveDate> {
    let hist = (sorted_dates.len() as f64 * range.clamp(0.0, 1.0)).floor() as usize;
    let n_cp = if n_changepoints >= hist {
        hist.saturating_sub(1)
    } else {
        n_changepoints
    };
    if n_cp == 0 {
        return Vec::new();
    }

    let last = (hist - 1) as f64;
    (1..=n_cp)
        .map(|i| {
            let pos = last * i as f64 / n_cp as f64;
            sorted_dates[pos.round_ties_even() as usize]
        })
        .collect()
}

/// Fill the trend part of a design row: `[t, 1, (t - s_1)^+, ..., (t - s_S)^+]`.
pub fn fill_trend_row(t: f64, changepoints_t: &[f64], out: &mut [f64]) {
    out[0] = t;
    out[1] = 1.0;
    for (slot, &s) in out[2..].iter_mut().zip(changepoints_t) {
        *slot = (t - s).max(0.0);
    }
}

/// Evaluate the trend at scaled time `t`.
pub fn piecewise_linear(t: f64, k: f64, m: f64, deltas: &[f64], changepoints_t: &[f64]) -> f64 {
    let bends: f64 = deltas
        .iter()
        .zip(changepoints_t)
        .map(|(d, &s)| d * (t - s).max(0.0))
        .sum();
    k * t + m + bends
}

/// Number of trend columns in a design row for `n_changepoints` changepoints.
pub fn trend_width(n_changepoints: usize) -> usize {
    2 + n_changepoints
}

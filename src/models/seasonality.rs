//! Yearly Fourier seasonality.
//!
//! Features are computed on absolute time (days since 1970-01-01) so they do not
//! depend on where the history starts.

use std::collections::HashSet;
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

use crate::domain::SeasonalityMode;

/// Period of the yearly cycle, in days.
pub const YEAR_DAYS: f64 = 365.25;

/// Minimum history span (days) before `Auto` considers yearly seasonality.
const MIN_SPAN_DAYS: i64 = 730;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Decide the Fourier order for the given history (0 means disabled).
///
/// `Auto` needs two years of history and observations on more than one day of
/// the year: with year-granularity dates every row has the same phase, so the
/// Fourier columns are constants and carry no information.
pub fn resolve_order(mode: SeasonalityMode, order: usize, sorted_dates: &[NaiveDate]) -> usize {
    match mode {
        SeasonalityMode::Off => 0,
        SeasonalityMode::On => order,
        SeasonalityMode::Auto => {
            let (Some(first), Some(last)) = (sorted_dates.first(), sorted_dates.last()) else {
                return 0;
            };
            if (*last - *first).num_days() < MIN_SPAN_DAYS {
                return 0;
            }
            let phases: HashSet<u32> = sorted_dates.iter().map(|d| d.ordinal()).collect();
            if phases.len() > 1 { order } else { 0 }
        }
    }
}

/// Fill `[sin(2π·1·t/P), cos(2π·1·t/P), ..., sin(2π·N·t/P), cos(2π·N·t/P)]`.
///
/// `out` must hold `2 * order` values.
pub fn fill_fourier_row(ds: NaiveDate, order: usize, out: &mut [f64]) {
    let t = (ds - epoch()).num_days() as f64;
    for i in 0..order {
        let x = 2.0 * PI * (i + 1) as f64 * t / YEAR_DAYS;
        out[2 * i] = x.sin();
        out[2 * i + 1] = x.cos();
    }
}

/// Seasonal component at `ds` for the fitted coefficients.
pub fn seasonal_effect(ds: NaiveDate, betas: &[f64]) -> f64 {
    let order = betas.len() / 2;
    if order == 0 {
        return 0.0;
    }
    let mut row = vec![0.0; 2 * order];
    fill_fourier_row(ds, order, &mut row);
    row.iter().zip(betas).map(|(a, b)| a * b).sum()
}

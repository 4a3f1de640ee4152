//! Additive trend + regressor forecaster.
//!
//! Model (in scaled units, `ỹ = y / y_scale`):
//!
//! ```text
//! ỹ(t) = g(t) + β_x · (x - μ_x) / σ_x + Σ Fourier_i(t) β_i + ε,   ε ~ N(0, σ²)
//! ```
//!
//! with `g` the piecewise-linear trend from [`super::trend`]. Priors:
//!
//! - `k, m ~ N(0, 5)`
//! - `δ_j ~ Laplace(0, changepoint_prior_scale)`
//! - `β_x ~ N(0, regressor_prior_scale)`, `β_i ~ N(0, seasonality_prior_scale)`
//! - `σ ~ HalfNormal(0.5)`
//!
//! The MAP estimate is computed by alternating two exact steps:
//!
//! 1. Given `σ`, the coefficients solve a penalized least squares problem. The
//!    Gaussian priors are ridge penalties; the Laplace prior is handled by IRLS
//!    (each pass replaces `|δ|/b` by its quadratic majorizer at the previous
//!    `δ`). The first pass uses the Gaussian with the Laplace's variance.
//! 2. Given the coefficients, `σ` has a closed form:
//!    `σ² = (-n + sqrt(n² + 16·RSS)) / 8`.
//!
//! Everything is deterministic: the same history always yields the same model.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::ModelOptions;
use crate::error::AppError;
use crate::math::{mean, sample_std, solve_penalized};
use crate::models::seasonality::{fill_fourier_row, resolve_order, seasonal_effect};
use crate::models::trend::{TimeScale, fill_trend_row, piecewise_linear, select_changepoints, trend_width};

/// Scale of the Gaussian prior on the base slope and offset.
const TREND_PRIOR_SCALE: f64 = 5.0;
/// Scale of the half-normal prior on the observation noise.
const SIGMA_PRIOR_SCALE: f64 = 0.5;
/// Lower bound on `σ` (scaled units) so penalties never vanish entirely.
const SIGMA_FLOOR: f64 = 1e-6;
/// Lower bound on `|δ|` in the IRLS weights.
const DELTA_FLOOR: f64 = 1e-6;
/// Convergence threshold on the largest coefficient change.
const TOLERANCE: f64 = 1e-8;

/// One training observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingPoint {
    pub ds: NaiveDate,
    pub y: f64,
    /// Value of the extra regressor on this date.
    pub x: f64,
}

/// Standardization applied to the extra regressor before it enters the design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressorScale {
    pub mu: f64,
    pub std: f64,
}

impl RegressorScale {
    /// Standardize unless the column is binary `{0, 1}` or constant.
    pub fn from_values(values: &[f64]) -> Self {
        let mut distinct: Vec<f64> = values.to_vec();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        distinct.dedup();

        let is_binary = distinct.len() == 2 && distinct[0] == 0.0 && distinct[1] == 1.0;
        if distinct.len() < 2 || is_binary {
            return Self { mu: 0.0, std: 1.0 };
        }

        match (mean(values), sample_std(values)) {
            (Some(mu), Some(std)) if std > 0.0 => Self { mu, std },
            _ => Self { mu: 0.0, std: 1.0 },
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        (x - self.mu) / self.std
    }
}

/// A fitted model: scales, structure and MAP parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub time: TimeScale,
    pub y_scale: f64,
    pub changepoints: Vec<NaiveDate>,
    /// Changepoints in scaled time.
    pub changepoints_t: Vec<f64>,
    /// Base slope.
    pub k: f64,
    /// Offset.
    pub m: f64,
    /// Slope changes, one per changepoint.
    pub deltas: Vec<f64>,
    pub regressor: RegressorScale,
    pub regressor_beta: f64,
    /// Fourier coefficients (`2 * order` values; empty when seasonality is off).
    pub seasonal_betas: Vec<f64>,
    /// Observation noise in scaled units.
    pub sigma_obs: f64,
    pub n_train: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl FittedModel {
    /// Trend in scaled units at scaled time `t`.
    pub fn trend(&self, t: f64) -> f64 {
        piecewise_linear(t, self.k, self.m, &self.deltas, &self.changepoints_t)
    }

    /// Non-trend part (regressor + seasonality) in scaled units.
    pub fn additive_terms(&self, ds: NaiveDate, x: f64) -> f64 {
        self.regressor_beta * self.regressor.apply(x) + seasonal_effect(ds, &self.seasonal_betas)
    }

    /// Point forecast for one date and regressor value, in original units.
    pub fn predict_one(&self, ds: NaiveDate, x: f64) -> f64 {
        let t = self.time.t(ds);
        (self.trend(t) + self.additive_terms(ds, x)) * self.y_scale
    }

    /// Point forecasts for `(date, regressor)` pairs, in input order.
    pub fn predict(&self, future: &[(NaiveDate, f64)]) -> Result<Vec<f64>, AppError> {
        future
            .iter()
            .map(|&(ds, x)| {
                let yhat = self.predict_one(ds, x);
                if yhat.is_finite() {
                    Ok(yhat)
                } else {
                    Err(AppError::model_fit(format!("Non-finite prediction for {ds}.")))
                }
            })
            .collect()
    }
}

/// Fit the model on `history` (any order; duplicate dates allowed).
pub fn fit(history: &[TrainingPoint], opts: &ModelOptions) -> Result<FittedModel, AppError> {
    if history.len() < 2 {
        return Err(AppError::model_fit(format!(
            "Need at least 2 training rows with a target value, got {}.",
            history.len()
        )));
    }
    if history.iter().any(|p| !(p.y.is_finite() && p.x.is_finite())) {
        return Err(AppError::model_fit("Training data contains non-finite values."));
    }

    let mut sorted = history.to_vec();
    sorted.sort_by_key(|p| p.ds);
    let dates: Vec<NaiveDate> = sorted.iter().map(|p| p.ds).collect();

    let time = TimeScale::new(dates[0], dates[dates.len() - 1]);
    let y_scale = match sorted.iter().map(|p| p.y.abs()).fold(0.0, f64::max) {
        s if s > 0.0 => s,
        _ => 1.0,
    };

    let changepoints = select_changepoints(&dates, opts.n_changepoints, opts.changepoint_range);
    let changepoints_t: Vec<f64> = changepoints.iter().map(|&d| time.t(d)).collect();

    let xs: Vec<f64> = sorted.iter().map(|p| p.x).collect();
    let regressor = RegressorScale::from_values(&xs);
    let order = resolve_order(opts.seasonality, opts.yearly_fourier_order, &dates);

    // Column layout: [k, m, δ_1..δ_S, β_x, fourier...].
    let n = sorted.len();
    let s = changepoints_t.len();
    let reg_col = trend_width(s);
    let season_col = reg_col + 1;
    let p = season_col + 2 * order;

    let mut design = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, point) in sorted.iter().enumerate() {
        fill_trend_row(time.t(point.ds), &changepoints_t, &mut row[..reg_col]);
        row[reg_col] = regressor.apply(point.x);
        fill_fourier_row(point.ds, order, &mut row[season_col..]);
        for (j, v) in row.iter().enumerate() {
            design[(i, j)] = *v;
        }
    }
    let target = DVector::from_iterator(n, sorted.iter().map(|p| p.y / y_scale));

    // Prior precisions (1 / scale²) for the Gaussian-prior columns.
    let mut precision = vec![0.0; p];
    precision[0] = 1.0 / (TREND_PRIOR_SCALE * TREND_PRIOR_SCALE);
    precision[1] = precision[0];
    precision[reg_col] = 1.0 / (opts.regressor_prior_scale * opts.regressor_prior_scale);
    for v in &mut precision[season_col..] {
        *v = 1.0 / (opts.seasonality_prior_scale * opts.seasonality_prior_scale);
    }
    let tau = opts.changepoint_prior_scale;
    if !(tau.is_finite() && tau > 0.0) {
        return Err(AppError::model_fit("Changepoint prior scale must be finite and > 0."));
    }

    let mut sigma = SIGMA_PRIOR_SCALE;
    let mut theta: Option<DVector<f64>> = None;
    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..opts.max_iters.max(1) {
        iterations = iter + 1;

        // Laplace prior: Gaussian with matching variance on the first pass, IRLS after.
        for j in 0..s {
            precision[2 + j] = match &theta {
                None => 1.0 / (2.0 * tau * tau),
                Some(prev) => 1.0 / (tau * prev[2 + j].abs().max(DELTA_FLOOR)),
            };
        }

        // The objective is scaled by 2σ², so each prior term carries σ².
        let penalty: Vec<f64> = precision.iter().map(|c| c * sigma * sigma).collect();
        let next = solve_penalized(&design, &target, &penalty)
            .ok_or_else(|| AppError::model_fit("Least squares solve failed (ill-conditioned design)."))?;
        if next.iter().any(|v| !v.is_finite()) {
            return Err(AppError::model_fit("Model fit produced non-finite parameters."));
        }

        let residuals = &target - &design * &next;
        let rss = residuals.norm_squared();
        let nf = n as f64;
        sigma = ((-nf + (nf * nf + 16.0 * rss).sqrt()) / 8.0).max(0.0).sqrt().max(SIGMA_FLOOR);

        let change = theta
            .as_ref()
            .map(|prev| (prev - &next).amax())
            .unwrap_or(f64::INFINITY);
        theta = Some(next);
        if change < TOLERANCE {
            converged = true;
            break;
        }
    }

    let theta = theta.ok_or_else(|| AppError::model_fit("Model fit did not run."))?;
    if !converged {
        tracing::debug!(iterations, "MAP refinement stopped at the iteration cap");
    }

    Ok(FittedModel {
        time,
        y_scale,
        changepoints,
        changepoints_t,
        k: theta[0],
        m: theta[1],
        deltas: theta.rows(2, s).iter().copied().collect(),
        regressor,
        regressor_beta: theta[reg_col],
        seasonal_betas: theta.rows(season_col, 2 * order).iter().copied().collect(),
        sigma_obs: sigma,
        n_train: n,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeasonalityMode;

    fn year(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn linear_history(years: std::ops::RangeInclusive<i32>, regressor: impl Fn(i32) -> f64) -> Vec<TrainingPoint> {
        years
            .map(|y| {
                let x = regressor(y);
                TrainingPoint {
                    ds: year(y),
                    y: 60.0 + 0.3 * (y - 2000) as f64 + 0.002 * x,
                    x,
                }
            })
            .collect()
    }

    #[test]
    fn regressor_scale_rules() {
        assert_eq!(RegressorScale::from_values(&[0.0, 1.0, 1.0]), RegressorScale { mu: 0.0, std: 1.0 });
        assert_eq!(RegressorScale::from_values(&[3.0, 3.0]), RegressorScale { mu: 0.0, std: 1.0 });
        let s = RegressorScale::from_values(&[1.0, 2.0, 3.0]);
        assert!((s.mu - 2.0).abs() < 1e-12);
        assert!((s.std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_tiny_history() {
        let one = linear_history(2010..=2010, |_| 1.0);
        let err = fit(&one, &ModelOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelFit);
    }

    #[test]
    fn rejects_non_finite_training_values() {
        let mut history = linear_history(2000..=2010, |y| y as f64);
        history[3].x = f64::NAN;
        assert!(fit(&history, &ModelOptions::default()).is_err());
    }

    #[test]
    fn fits_and_extrapolates_a_noise_free_linear_trend() {
        // Regressor grows non-linearly so it is not collinear with time.
        let history = linear_history(2000..=2016, |y| ((y - 2000) as f64).powi(2) * 10.0);
        let model = fit(&history, &ModelOptions::default()).unwrap();

        assert!(model.iterations >= 1);
        for p in &history {
            let yhat = model.predict_one(p.ds, p.x);
            assert!((yhat - p.y).abs() < 0.05, "in-sample {} vs {}", yhat, p.y);
        }

        let x = 17.0_f64.powi(2) * 10.0;
        let truth = 60.0 + 0.3 * 17.0 + 0.002 * x;
        let yhat = model.predict_one(year(2017), x);
        assert!((yhat - truth).abs() < 0.2, "forecast {yhat} vs {truth}");
    }

    #[test]
    fn prediction_moves_with_the_regressor() {
        let history = linear_history(2000..=2016, |y| ((y - 2000) as f64).powi(2) * 10.0);
        let model = fit(&history, &ModelOptions::default()).unwrap();
        assert!(model.regressor_beta > 0.0);

        let low = model.predict_one(year(2017), 1000.0);
        let high = model.predict_one(year(2017), 3000.0);
        assert!(high > low);
    }

    #[test]
    fn fit_is_deterministic_and_order_independent() {
        let history = linear_history(2000..=2016, |y| (y as f64).sqrt());
        let mut reversed = history.clone();
        reversed.reverse();

        let a = fit(&history, &ModelOptions::default()).unwrap();
        let b = fit(&reversed, &ModelOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_dates_from_several_entities_are_accepted() {
        let mut history = linear_history(2005..=2016, |y| y as f64 * 1.5);
        history.extend(linear_history(2005..=2016, |y| y as f64 * 0.5));
        let model = fit(&history, &ModelOptions::default()).unwrap();
        assert_eq!(model.n_train, 24);
        let out = model.predict(&[(year(2017), 3000.0), (year(2018), 1000.0)]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn year_granularity_history_has_no_seasonal_terms() {
        let history = linear_history(2000..=2016, |y| y as f64);
        let model = fit(&history, &ModelOptions::default()).unwrap();
        assert!(model.seasonal_betas.is_empty());

        let forced = ModelOptions {
            seasonality: SeasonalityMode::On,
            yearly_fourier_order: 3,
            ..ModelOptions::default()
        };
        let model = fit(&history, &forced).unwrap();
        assert_eq!(model.seasonal_betas.len(), 6);
    }

    #[test]
    fn changepoints_are_bounded_by_history() {
        let history = linear_history(2010..=2016, |y| y as f64);
        let model = fit(&history, &ModelOptions::default()).unwrap();
        assert_eq!(model.changepoints.len(), 4);
        assert_eq!(model.deltas.len(), 4);
        assert!(model.changepoints_t.iter().all(|&t| (0.0..=1.0).contains(&t)));
    }
}

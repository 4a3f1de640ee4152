//! Predictive uncertainty intervals by simulation.
//!
//! Each simulated path keeps the fitted trend but, beyond the end of history
//! (`t > 1`), adds new changepoints: their count is Poisson with the historical
//! rate `S · (T - 1)`, their positions are uniform on `(1, T]`, and their slope
//! changes are Laplace with scale `mean(|δ|)`. Observation noise `N(0, σ)` is
//! added on top. The interval bounds are empirical quantiles over the paths.

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal, Poisson};

use crate::error::AppError;
use crate::math::quantile_mut;
use crate::models::forecaster::FittedModel;

/// Lower/upper bounds for one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

/// Simulate `samples` paths and return the `width` central interval per row.
pub fn predictive_intervals(
    model: &FittedModel,
    future: &[(NaiveDate, f64)],
    samples: usize,
    width: f64,
    seed: u64,
) -> Result<Vec<Interval>, AppError> {
    if future.is_empty() {
        return Ok(Vec::new());
    }
    if samples == 0 {
        return Err(AppError::model_fit("Uncertainty sample count must be > 0."));
    }
    if !(width > 0.0 && width < 1.0) {
        return Err(AppError::model_fit("Interval width must be in (0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let ts: Vec<f64> = future.iter().map(|&(ds, _)| model.time.t(ds)).collect();
    let base: Vec<f64> = future
        .iter()
        .zip(&ts)
        .map(|(&(ds, x), &t)| model.trend(t) + model.additive_terms(ds, x))
        .collect();

    let horizon = ts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rate = model.changepoints_t.len() as f64 * (horizon - 1.0);
    let poisson = if rate > 0.0 {
        Some(Poisson::new(rate).map_err(|e| AppError::model_fit(format!("Changepoint rate error: {e}")))?)
    } else {
        None
    };

    let mean_abs_delta = if model.deltas.is_empty() {
        0.0
    } else {
        model.deltas.iter().map(|d| d.abs()).sum::<f64>() / model.deltas.len() as f64
    };
    let laplace_scale = mean_abs_delta + 1e-8;
    let magnitude = Exp::new(1.0 / laplace_scale)
        .map_err(|e| AppError::model_fit(format!("Changepoint magnitude error: {e}")))?;
    let noise = Normal::new(0.0, model.sigma_obs)
        .map_err(|e| AppError::model_fit(format!("Noise distribution error: {e}")))?;

    // paths[row][sample]
    let mut paths = vec![Vec::with_capacity(samples); future.len()];
    for _ in 0..samples {
        let n_new = poisson.as_ref().map(|p| p.sample(&mut rng) as usize).unwrap_or(0);
        let new_changes: Vec<(f64, f64)> = (0..n_new)
            .map(|_| {
                let at = 1.0 + rng.gen_range(0.0..1.0) * (horizon - 1.0);
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                (at, sign * magnitude.sample(&mut rng))
            })
            .collect();

        for (row, (&t, &b)) in ts.iter().zip(&base).enumerate() {
            let bend: f64 = new_changes.iter().map(|&(s, d)| d * (t - s).max(0.0)).sum();
            let y = (b + bend + noise.sample(&mut rng)) * model.y_scale;
            paths[row].push(y);
        }
    }

    let lo_q = (1.0 - width) / 2.0;
    let hi_q = 1.0 - lo_q;
    paths
        .into_iter()
        .map(|mut draws| {
            let lower = quantile_mut(&mut draws, lo_q);
            let upper = quantile_mut(&mut draws, hi_q);
            match (lower, upper) {
                (Some(lower), Some(upper)) => Ok(Interval { lower, upper }),
                _ => Err(AppError::model_fit("Interval estimation produced no draws.")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelOptions;
    use crate::models::forecaster::{TrainingPoint, fit};

    fn year(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn noisy_model() -> FittedModel {
        let wiggle = [0.4, -0.3, 0.1, -0.5, 0.2, 0.3, -0.1, 0.0, 0.5, -0.4, 0.1, -0.2];
        let history: Vec<TrainingPoint> = (2005..=2016)
            .zip(wiggle)
            .map(|(y, w)| TrainingPoint {
                ds: year(y),
                y: 65.0 + 0.25 * (y - 2005) as f64 + w,
                x: ((y - 2005) as f64).sqrt(),
            })
            .collect();
        fit(&history, &ModelOptions::default()).unwrap()
    }

    #[test]
    fn intervals_bracket_the_point_forecast() {
        let model = noisy_model();
        let future = [(year(2017), 3.4), (year(2019), 3.7)];
        let yhat = model.predict(&future).unwrap();
        let intervals = predictive_intervals(&model, &future, 500, 0.8, 0).unwrap();

        assert_eq!(intervals.len(), 2);
        for (iv, y) in intervals.iter().zip(&yhat) {
            assert!(iv.lower < iv.upper);
            assert!(iv.lower <= *y && *y <= iv.upper, "{y} outside [{}, {}]", iv.lower, iv.upper);
        }
    }

    #[test]
    fn same_seed_same_intervals() {
        let model = noisy_model();
        let future = [(year(2018), 3.5)];
        let a = predictive_intervals(&model, &future, 200, 0.8, 11).unwrap();
        let b = predictive_intervals(&model, &future, 200, 0.8, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_future_gives_no_intervals() {
        let model = noisy_model();
        assert!(predictive_intervals(&model, &[], 100, 0.8, 0).unwrap().is_empty());
    }

    #[test]
    fn invalid_width_is_rejected() {
        let model = noisy_model();
        assert!(predictive_intervals(&model, &[(year(2017), 1.0)], 100, 1.5, 0).is_err());
    }
}

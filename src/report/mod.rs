//! Evaluation of one regressor's model on the held-out years, plus console formatting.

pub mod format;

pub use format::*;

use chrono::NaiveDate;

use crate::data::Split;
use crate::domain::{ForecastRow, Observation, PipelineConfig};
use crate::error::AppError;
use crate::math::mean_absolute_error;
use crate::models::{FittedModel, TrainingPoint, fit, predictive_intervals};

/// Everything computed for one regressor.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub regressor: String,
    /// One row per test observation, sorted by date.
    pub rows: Vec<ForecastRow>,
    /// `None` when the test set is empty.
    pub mae: Option<f64>,
    pub model: FittedModel,
    pub n_train: usize,
    pub n_test: usize,
}

impl Evaluation {
    /// `(date, yhat)` pairs for plotting.
    pub fn predicted_series(&self) -> Vec<(NaiveDate, f64)> {
        self.rows.iter().map(|r| (r.ds, r.yhat)).collect()
    }
}

/// Fit on the training rows, predict every test row, and score.
///
/// Test rows use their own (actual) regressor values as the model's future
/// input. Each prediction is paired with the actual of the same row, so the
/// result has exactly one row per test observation even when several entities
/// share a year.
pub fn evaluate_regressor(split: &Split, regressor: &str, config: &PipelineConfig) -> Result<Evaluation, AppError> {
    let col = split
        .train
        .regressor_index(regressor)
        .ok_or_else(|| AppError::data_load(format!("Regressor `{regressor}` is not a loaded column.")))?;

    let history = training_points(&split.train.observations, col, regressor)?;
    let model = fit(&history, &config.model)
        .map_err(|e| AppError::model_fit(format!("Model fit failed for `{regressor}`: {e}")))?;

    let mut test: Vec<&Observation> = split.test.observations.iter().collect();
    test.sort_by_key(|o| o.ds);

    let mut future = Vec::with_capacity(test.len());
    let mut actuals = Vec::with_capacity(test.len());
    for o in &test {
        let x = o.regressors.get(col).copied().flatten().ok_or_else(|| {
            AppError::model_fit(format!(
                "Missing value for regressor `{regressor}` in the forecast period (line {}).",
                o.line
            ))
        })?;
        let y = o.y.ok_or_else(|| {
            AppError::data_load(format!("Missing actual value for {} (line {}).", o.ds, o.line))
        })?;
        future.push((o.ds, x));
        actuals.push(y);
    }

    let yhat = model.predict(&future)?;
    let intervals = if config.intervals {
        Some(predictive_intervals(
            &model,
            &future,
            config.model.uncertainty_samples,
            config.model.interval_width,
            config.model.seed,
        )?)
    } else {
        None
    };

    let rows: Vec<ForecastRow> = future
        .iter()
        .zip(yhat.iter().zip(&actuals))
        .enumerate()
        .map(|(i, (&(ds, _), (&yhat, &y)))| {
            let interval = intervals.as_ref().map(|ivs| ivs[i]);
            ForecastRow {
                ds,
                yhat,
                y,
                diff: yhat - y,
                yhat_lower: interval.map(|iv| iv.lower),
                yhat_upper: interval.map(|iv| iv.upper),
            }
        })
        .collect();

    let mae = mean_absolute_error(&yhat, &actuals);
    tracing::debug!(
        regressor,
        n_train = history.len(),
        n_test = rows.len(),
        iterations = model.iterations,
        changepoints = model.changepoints.len(),
        "evaluated regressor"
    );

    Ok(Evaluation {
        regressor: regressor.to_string(),
        rows,
        mae,
        n_train: history.len(),
        n_test: test.len(),
        model,
    })
}

/// Rows with a target value become training points; their regressor must be present.
fn training_points(observations: &[Observation], col: usize, regressor: &str) -> Result<Vec<TrainingPoint>, AppError> {
    observations
        .iter()
        .filter_map(|o| o.y.map(|y| (o, y)))
        .map(|(o, y)| {
            let x = o.regressors.get(col).copied().flatten().ok_or_else(|| {
                AppError::model_fit(format!(
                    "Missing value for regressor `{regressor}` in the training data (line {}).",
                    o.line
                ))
            })?;
            Ok(TrainingPoint { ds: o.ds, y, x })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::train_test_split;
    use crate::domain::{DEFAULT_SPLIT_YEAR, Dataset};
    use crate::error::ErrorKind;

    fn obs(line: usize, year: i32, y: Option<f64>, x: Option<f64>) -> Observation {
        Observation {
            line,
            ds: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            y,
            regressors: vec![x],
        }
    }

    fn dataset(rows: Vec<Observation>) -> Dataset {
        Dataset {
            regressors: vec!["GDP".to_string()],
            observations: rows,
        }
    }

    fn series(years: std::ops::RangeInclusive<i32>) -> Vec<Observation> {
        years
            .enumerate()
            .map(|(i, y)| {
                let x = 1000.0 + 40.0 * (i as f64).powf(1.5);
                obs(i + 2, y, Some(62.0 + 0.35 * i as f64 + 0.001 * x), Some(x))
            })
            .collect()
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new("in.csv", "out", vec!["GDP".to_string()])
    }

    #[test]
    fn one_row_per_test_observation_sorted_by_date() {
        let mut rows = series(2010..=2018);
        rows.reverse();
        let split = train_test_split(&dataset(rows), DEFAULT_SPLIT_YEAR);
        let eval = evaluate_regressor(&split, "GDP", &config()).unwrap();

        assert_eq!(eval.n_train, 7);
        assert_eq!(eval.rows.len(), 2);
        assert_eq!(eval.rows[0].ds, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(eval.rows[1].ds, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        for r in &eval.rows {
            assert!((r.diff - (r.yhat - r.y)).abs() < 1e-12);
            assert!(r.yhat_lower.is_none());
        }
    }

    #[test]
    fn mae_is_mean_absolute_diff() {
        let split = train_test_split(&dataset(series(2005..=2019)), DEFAULT_SPLIT_YEAR);
        let eval = evaluate_regressor(&split, "GDP", &config()).unwrap();
        let expected = eval.rows.iter().map(|r| r.diff.abs()).sum::<f64>() / eval.rows.len() as f64;
        assert!((eval.mae.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn duplicate_years_are_not_cross_joined() {
        let mut rows = series(2010..=2018);
        rows.extend(series(2010..=2018).into_iter().map(|mut o| {
            o.line += 100;
            o.y = o.y.map(|y| y - 5.0);
            o
        }));
        let split = train_test_split(&dataset(rows), DEFAULT_SPLIT_YEAR);
        let eval = evaluate_regressor(&split, "GDP", &config()).unwrap();
        assert_eq!(eval.rows.len(), split.test.len());
        assert_eq!(eval.rows.len(), 4);
    }

    #[test]
    fn empty_test_set_has_undefined_mae() {
        let split = train_test_split(&dataset(series(2008..=2016)), DEFAULT_SPLIT_YEAR);
        let eval = evaluate_regressor(&split, "GDP", &config()).unwrap();
        assert!(eval.rows.is_empty());
        assert!(eval.mae.is_none());
    }

    #[test]
    fn rows_without_target_are_left_out_of_training() {
        let mut rows = series(2010..=2018);
        rows[0].y = None;
        rows[0].regressors = vec![None];
        let split = train_test_split(&dataset(rows), DEFAULT_SPLIT_YEAR);
        let eval = evaluate_regressor(&split, "GDP", &config()).unwrap();
        assert_eq!(eval.n_train, 6);
    }

    #[test]
    fn missing_regressor_in_training_is_a_fit_error() {
        let mut rows = series(2010..=2018);
        rows[3].regressors = vec![None];
        let split = train_test_split(&dataset(rows), DEFAULT_SPLIT_YEAR);
        let err = evaluate_regressor(&split, "GDP", &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
        assert!(err.message().contains("line 5"));
    }

    #[test]
    fn missing_regressor_in_test_is_a_fit_error() {
        let mut rows = series(2010..=2018);
        rows[8].regressors = vec![None];
        let split = train_test_split(&dataset(rows), DEFAULT_SPLIT_YEAR);
        let err = evaluate_regressor(&split, "GDP", &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
    }

    #[test]
    fn too_little_history_is_a_fit_error() {
        let split = train_test_split(&dataset(series(2016..=2018)), DEFAULT_SPLIT_YEAR);
        let err = evaluate_regressor(&split, "GDP", &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelFit);
    }

    #[test]
    fn unknown_regressor_is_a_load_error() {
        let split = train_test_split(&dataset(series(2010..=2018)), DEFAULT_SPLIT_YEAR);
        let err = evaluate_regressor(&split, "Schooling", &config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
    }

    #[test]
    fn intervals_are_attached_when_requested() {
        let split = train_test_split(&dataset(series(2005..=2018)), DEFAULT_SPLIT_YEAR);
        let mut cfg = config();
        cfg.intervals = true;
        cfg.model.uncertainty_samples = 200;
        let eval = evaluate_regressor(&split, "GDP", &cfg).unwrap();
        for r in &eval.rows {
            let (lo, hi) = (r.yhat_lower.unwrap(), r.yhat_upper.unwrap());
            assert!(lo <= hi);
        }
    }
}

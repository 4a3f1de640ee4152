//! Shared evaluation pipeline behind `lifecast run`.
//!
//! load -> split -> (fit, predict, score, write) per regressor -> chart
//!
//! Regressors are independent of each other. The sequential path writes each
//! regressor's outputs as soon as it is scored; the `parallel` path fits all of
//! them on the rayon pool first and then writes in configured order, so console
//! and file output look the same either way.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::data::{Split, train_test_split};
use crate::domain::{Dataset, PipelineConfig};
use crate::error::AppError;
use crate::io::{CHART_FILE_NAME, ModelFile, load_dataset, model_path, results_path, write_model_json, write_results_csv};
use crate::plot::{PredictionSeries, render_predictions_png};
use crate::report::{Evaluation, evaluate_regressor, format_mae_line, format_model_summary};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub split: Split,
    /// One per configured regressor, in configured order.
    pub evaluations: Vec<Evaluation>,
    /// Path of the chart, when one was rendered.
    pub chart: Option<PathBuf>,
}

/// Execute the full pipeline, writing MAE lines to `out`.
pub fn run_pipeline<W: Write>(config: &PipelineConfig, out: &mut W) -> Result<RunOutput, AppError> {
    validate_config(config)?;

    let dataset = load_dataset(config)?;
    let split = train_test_split(&dataset, config.split_year);

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        AppError::io(format!("Failed to create output directory '{}': {e}", config.output_dir.display()))
    })?;

    let evaluations = if config.parallel {
        let evaluations = evaluate_all_parallel(&split, config)?;
        for eval in &evaluations {
            persist_and_report(eval, config, out)?;
        }
        evaluations
    } else {
        let mut evaluations = Vec::with_capacity(config.regressors.len());
        for regressor in &config.regressors {
            let eval = evaluate_regressor(&split, regressor, config)?;
            persist_and_report(&eval, config, out)?;
            evaluations.push(eval);
        }
        evaluations
    };

    let chart = if config.plot {
        let path = config.output_dir.join(CHART_FILE_NAME);
        let predictions: Vec<PredictionSeries> = evaluations
            .iter()
            .map(|e| PredictionSeries {
                regressor: e.regressor.clone(),
                points: e.predicted_series(),
            })
            .collect();
        render_predictions_png(&path, &actual_test_series(&split), &predictions, config.font.as_deref())?;
        Some(path)
    } else {
        None
    };

    Ok(RunOutput {
        dataset,
        split,
        evaluations,
        chart,
    })
}

/// Evaluate every configured regressor on the rayon pool, keeping configured order.
pub fn evaluate_all_parallel(split: &Split, config: &PipelineConfig) -> Result<Vec<Evaluation>, AppError> {
    config
        .regressors
        .par_iter()
        .map(|regressor| evaluate_regressor(split, regressor, config))
        .collect()
}

fn validate_config(config: &PipelineConfig) -> Result<(), AppError> {
    if config.regressors.is_empty() {
        return Err(AppError::data_load("No regressors configured."));
    }
    let range = config.model.changepoint_range;
    if !(0.0..=1.0).contains(&range) {
        return Err(AppError::data_load(format!("Changepoint range must be in [0, 1], got {range}.")));
    }
    if config.intervals {
        let width = config.model.interval_width;
        if !(width > 0.0 && width < 1.0) {
            return Err(AppError::data_load(format!("Interval width must be in (0, 1), got {width}.")));
        }
        if config.model.uncertainty_samples == 0 {
            return Err(AppError::data_load("Uncertainty sample count must be > 0."));
        }
    }
    Ok(())
}

fn persist_and_report<W: Write>(eval: &Evaluation, config: &PipelineConfig, out: &mut W) -> Result<(), AppError> {
    let path = results_path(&config.output_dir, &eval.regressor);
    write_results_csv(&path, &eval.rows, config.intervals)?;
    tracing::info!(regressor = %eval.regressor, path = %path.display(), rows = eval.rows.len(), "wrote results");

    if config.export_models {
        let path = model_path(&config.output_dir, &eval.regressor);
        write_model_json(&path, &ModelFile::from_evaluation(eval, config.split_year))?;
        tracing::info!(regressor = %eval.regressor, path = %path.display(), "wrote model");
    }

    if eval.mae.is_none() {
        tracing::warn!(regressor = %eval.regressor, split_year = config.split_year, "test set is empty");
    }
    tracing::debug!("{}", format_model_summary(eval));

    writeln!(out, "{}", format_mae_line(&eval.regressor, eval.mae))
        .map_err(|e| AppError::io(format!("Failed to write to stdout: {e}")))
}

/// Actual test-period values, sorted by date.
fn actual_test_series(split: &Split) -> Vec<(NaiveDate, f64)> {
    let mut series: Vec<(NaiveDate, f64)> = split
        .test
        .observations
        .iter()
        .filter_map(|o| o.y.map(|y| (o.ds, y)))
        .collect();
    series.sort_by_key(|&(ds, _)| ds);
    series
}

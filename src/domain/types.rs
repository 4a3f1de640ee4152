//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built once by the loader and shared read-only by every stage
//! - exported to CSV/JSON
//! - compared in tests without touching the filesystem

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default name of the year column in the merged input file.
pub const DEFAULT_YEAR_COLUMN: &str = "Year";
/// Default name of the target column in the merged input file.
pub const DEFAULT_TARGET_COLUMN: &str = "Life expectancy";
/// Default name of the entity column used by `--entity`.
pub const DEFAULT_ENTITY_COLUMN: &str = "Country";
/// Last year that belongs to the training set.
pub const DEFAULT_SPLIT_YEAR: i32 = 2016;

/// Whether the yearly Fourier seasonality block is part of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// Enable only when the history spans at least two years *and* the
    /// observations fall on more than one day of the year.
    Auto,
    On,
    Off,
}

/// One input row after renaming (`Year` → `ds`, `Life expectancy` → `y`).
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// 1-based CSV line the row came from.
    pub line: usize,
    /// January 1st of the row's year.
    pub ds: NaiveDate,
    /// Target value; `None` for empty/`NA` cells.
    pub y: Option<f64>,
    /// Regressor values in the order of `Dataset::regressors`.
    pub regressors: Vec<Option<f64>>,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.ds.year()
    }
}

/// The loaded table: observations plus the regressor columns they carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub regressors: Vec<String>,
    pub observations: Vec<Observation>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Column index of a regressor, matched case-insensitively.
    pub fn regressor_index(&self, name: &str) -> Option<usize> {
        self.regressors
            .iter()
            .position(|r| r.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// A dataset with the same columns and only the selected rows.
    pub fn with_observations(&self, observations: Vec<Observation>) -> Dataset {
        Dataset {
            regressors: self.regressors.clone(),
            observations,
        }
    }
}

/// One row of `prophet_results_<regressor>.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub y: f64,
    /// `yhat - y`
    #[serde(rename = "Diff")]
    pub diff: f64,
    #[serde(skip)]
    pub yhat_lower: Option<f64>,
    #[serde(skip)]
    pub yhat_upper: Option<f64>,
}

/// Row layout used when uncertainty intervals are exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub y: f64,
    #[serde(rename = "Diff")]
    pub diff: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Model hyperparameters.
///
/// Defaults mirror the usual additive-forecaster defaults (25 changepoints in the
/// first 80% of history, Laplace(0.05) changepoint prior, N(0, 10) for seasonal
/// and regressor coefficients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub regressor_prior_scale: f64,
    pub seasonality: SeasonalityMode,
    pub yearly_fourier_order: usize,
    /// Upper bound on MAP refinement iterations.
    pub max_iters: usize,
    /// Central mass of the uncertainty interval (0.8 → 10th..90th percentile).
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            regressor_prior_scale: 10.0,
            seasonality: SeasonalityMode::Auto,
            yearly_fourier_order: 10,
            max_iters: 200,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags and environment (plus defaults) and handed to
/// every stage by reference.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Regressor column names, in reporting order.
    pub regressors: Vec<String>,

    pub year_column: String,
    pub target_column: String,
    pub entity_column: String,
    /// Keep only rows whose entity column equals this value.
    pub entity: Option<String>,

    /// Train on years `<= split_year`, test on years `> split_year`.
    pub split_year: i32,

    pub model: ModelOptions,

    /// Fit regressors on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Append `yhat_lower,yhat_upper` to the result CSVs.
    pub intervals: bool,
    /// Write `prophet_model_<regressor>.json` next to the results.
    pub export_models: bool,
    /// Render `prophet_predictions.png`.
    pub plot: bool,
    /// TrueType font used for chart text.
    pub font: Option<PathBuf>,
}

impl PipelineConfig {
    /// Configuration with default columns/model for the given input, output and regressors.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, regressors: Vec<String>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            regressors,
            year_column: DEFAULT_YEAR_COLUMN.to_string(),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            entity_column: DEFAULT_ENTITY_COLUMN.to_string(),
            entity: None,
            split_year: DEFAULT_SPLIT_YEAR,
            model: ModelOptions::default(),
            parallel: false,
            intervals: false,
            export_models: false,
            plot: true,
            font: None,
        }
    }
}

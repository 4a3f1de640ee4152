//! Command-line parsing for the life expectancy forecast evaluator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling code. Every flag that names a file or the regressor
//! list also reads an environment variable, so a `.env` file can carry a setup.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{
    DEFAULT_ENTITY_COLUMN, DEFAULT_SPLIT_YEAR, DEFAULT_TARGET_COLUMN, DEFAULT_YEAR_COLUMN, SeasonalityMode,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lifecast", version, about = "Life expectancy forecast evaluation, one model per regressor")]
pub struct Cli {
    /// More diagnostics on stderr (`-v` debug, `-vv` trace).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors on stderr.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one model per regressor, write results CSVs and the comparison chart.
    Run(RunArgs),
    /// Write a synthetic input CSV (demo data).
    Synth(SynthArgs),
}

/// Options for an evaluation run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Merged input CSV (year, target and regressor columns).
    #[arg(short = 'i', long, env = "LIFECAST_INPUT", default_value = "data/merged_data.csv")]
    pub input: PathBuf,

    /// Directory for results CSVs, the chart and model files.
    #[arg(short = 'o', long, env = "LIFECAST_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Regressor columns to evaluate, comma-separated.
    #[arg(
        short = 'r',
        long,
        env = "LIFECAST_REGRESSORS",
        value_delimiter = ',',
        default_value = "GDP"
    )]
    pub regressors: Vec<String>,

    /// Name of the year column.
    #[arg(long, default_value = DEFAULT_YEAR_COLUMN)]
    pub year_column: String,

    /// Name of the target column.
    #[arg(long, default_value = DEFAULT_TARGET_COLUMN)]
    pub target_column: String,

    /// Name of the entity column used by `--entity`.
    #[arg(long, default_value = DEFAULT_ENTITY_COLUMN)]
    pub entity_column: String,

    /// Keep only rows of this entity (case-insensitive).
    #[arg(long)]
    pub entity: Option<String>,

    /// Last training year; later years form the test set.
    #[arg(long, default_value_t = DEFAULT_SPLIT_YEAR)]
    pub split_year: i32,

    /// Yearly seasonality.
    #[arg(long, value_enum, default_value_t = SeasonalityMode::Auto)]
    pub seasonality: SeasonalityMode,

    /// Number of potential trend changepoints.
    #[arg(long, default_value_t = 25)]
    pub n_changepoints: usize,

    /// Fraction of history in which changepoints are placed.
    #[arg(long, default_value_t = 0.8)]
    pub changepoint_range: f64,

    /// Laplace scale of the changepoint prior.
    #[arg(long, default_value_t = 0.05)]
    pub changepoint_prior_scale: f64,

    /// Normal scale of the seasonality prior.
    #[arg(long, default_value_t = 10.0)]
    pub seasonality_prior_scale: f64,

    /// Normal scale of the regressor coefficient prior.
    #[arg(long, default_value_t = 10.0)]
    pub regressor_prior_scale: f64,

    /// Maximum MAP iterations.
    #[arg(long, default_value_t = 200)]
    pub max_iters: usize,

    /// Add `yhat_lower,yhat_upper` columns to the results CSVs.
    #[arg(long)]
    pub intervals: bool,

    /// Central width of the uncertainty interval.
    #[arg(long, default_value_t = 0.8)]
    pub interval_width: f64,

    /// Simulated paths per interval estimate.
    #[arg(long, default_value_t = 1000)]
    pub uncertainty_samples: usize,

    /// Random seed for interval simulation.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Fit the regressor models on a thread pool.
    #[arg(long)]
    pub parallel: bool,

    /// Also write `prophet_model_<regressor>.json` per regressor.
    #[arg(long)]
    pub export_models: bool,

    /// Skip the comparison chart.
    #[arg(long)]
    pub no_plot: bool,

    /// TrueType/OpenType font for chart text.
    #[arg(long, env = "LIFECAST_FONT")]
    pub font: Option<PathBuf>,
}

/// Options for the synthetic data generator.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of countries.
    #[arg(long, default_value_t = 1)]
    pub countries: usize,

    /// First year.
    #[arg(long, default_value_t = 2000)]
    pub start: i32,

    /// Last year (inclusive).
    #[arg(long, default_value_t = 2019)]
    pub end: i32,

    /// Regressor columns to generate, comma-separated.
    #[arg(short = 'r', long, value_delimiter = ',', default_value = "GDP")]
    pub regressors: Vec<String>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the target noise.
    #[arg(long, default_value_t = 0.3)]
    pub noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "lifecast",
            "-v",
            "run",
            "--input",
            "in.csv",
            "-r",
            "GDP,Schooling",
            "--split-year",
            "2015",
            "--parallel",
        ]);
        assert_eq!(cli.verbose, 1);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, PathBuf::from("in.csv"));
        assert_eq!(args.regressors, vec!["GDP", "Schooling"]);
        assert_eq!(args.split_year, 2015);
        assert!(args.parallel);
        assert!(!args.intervals);
    }

    #[test]
    fn synth_defaults() {
        let cli = Cli::parse_from(["lifecast", "synth", "--out", "x.csv"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.countries, 1);
        assert_eq!((args.start, args.end), (2000, 2019));
        assert_eq!(args.regressors, vec!["GDP"]);
    }
}

//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the log subscriber
//! - runs the evaluation pipeline or the synthetic data generator

use clap::Parser;

use crate::cli::{Command, RunArgs, SynthArgs};
use crate::data::{SynthConfig, write_synthetic_csv};
use crate::domain::{ModelOptions, PipelineConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `lifecast` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    crate::logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let run = pipeline::run_pipeline(&config, &mut out)?;

    tracing::info!(
        regressors = run.evaluations.len(),
        train = run.split.train.len(),
        test = run.split.test.len(),
        "run complete"
    );
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        countries: args.countries,
        start_year: args.start,
        end_year: args.end,
        regressors: args.regressors,
        seed: args.seed,
        noise: args.noise,
    };
    let rows = write_synthetic_csv(&args.out, &config)?;
    tracing::info!(path = %args.out.display(), rows, "wrote synthetic data");
    Ok(())
}

pub fn pipeline_config_from_args(args: &RunArgs) -> PipelineConfig {
    let regressors = args
        .regressors
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    PipelineConfig {
        input: args.input.clone(),
        output_dir: args.output_dir.clone(),
        regressors,
        year_column: args.year_column.clone(),
        target_column: args.target_column.clone(),
        entity_column: args.entity_column.clone(),
        entity: args.entity.clone(),
        split_year: args.split_year,
        model: ModelOptions {
            n_changepoints: args.n_changepoints,
            changepoint_range: args.changepoint_range,
            changepoint_prior_scale: args.changepoint_prior_scale,
            seasonality_prior_scale: args.seasonality_prior_scale,
            regressor_prior_scale: args.regressor_prior_scale,
            seasonality: args.seasonality,
            max_iters: args.max_iters,
            interval_width: args.interval_width,
            uncertainty_samples: args.uncertainty_samples,
            seed: args.seed,
            ..ModelOptions::default()
        },
        parallel: args.parallel,
        intervals: args.intervals,
        export_models: args.export_models,
        plot: !args.no_plot,
        font: args.font.clone(),
    }
}

/// Rewrite argv so `lifecast` defaults to `lifecast run`.
///
/// Rules:
/// - `lifecast`                       -> `lifecast run`
/// - `lifecast --input x.csv ...`     -> `lifecast run --input x.csv ...`
/// - `lifecast -v --input x.csv`      -> `lifecast -v run --input x.csv`
/// - `lifecast --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    // Global flags may precede the subcommand.
    let first = argv
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, a)| !is_global_flag(a))
        .map(|(i, a)| (i, a.clone()));

    let Some((at, arg)) = first else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg.as_str(), "run" | "synth");
    if is_subcommand {
        return argv;
    }

    if arg.starts_with('-') {
        argv.insert(at, "run".to_string());
    }
    argv
}

fn is_global_flag(arg: &str) -> bool {
    matches!(arg, "-q" | "--quiet" | "--verbose") || (arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v'))
}

//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the loaded table (`Observation`, `Dataset`)
//! - per-row forecast outputs (`ForecastRow`, `IntervalRow`)
//! - run configuration (`PipelineConfig`, `ModelOptions`, `SeasonalityMode`)

pub mod types;

pub use types::*;

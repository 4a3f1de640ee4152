//! `life-forecast` library crate.
//!
//! The binary (`lifecast`) is a thin wrapper around this library so that:
//!
//! - the pipeline stages are testable without spawning processes
//! - the model can be reused outside the command-line workflow

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

//! Chart rendering for the actual vs predicted comparison.

pub mod chart;
pub mod fonts;

pub use chart::*;

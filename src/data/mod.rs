//! Data preparation: train/test splitting and synthetic input generation.

pub mod split;
pub mod synth;

pub use split::*;
pub use synth::*;

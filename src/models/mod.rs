//! Additive forecasting model: piecewise-linear trend, yearly seasonality and
//! one standardized extra regressor, estimated by MAP.
//!
//! The pieces are small, pure functions so the fitting code and the uncertainty
//! simulation can share them.

pub mod forecaster;
pub mod seasonality;
pub mod trend;
pub mod uncertainty;

pub use forecaster::*;
pub use uncertainty::*;

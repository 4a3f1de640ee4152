//! Plotters-powered comparison chart: actual test-period values vs each
//! regressor's predictions, saved as PNG.
//!
//! All series and bounds are computed before any drawing happens, so the data
//! prep is testable on its own.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::fonts::{FONT_FAMILY, ensure_font};

pub const CHART_TITLE: &str = "Facebook Prophet - Life Expectancy Prediction vs Actual";
/// Pixel size of the PNG (12 × 6 inches at 100 dpi).
pub const CHART_SIZE: (u32, u32) = (1200, 600);

/// Line colors for predicted series, cycled when there are more regressors.
const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];
const ACTUAL_COLOR: RGBColor = RGBColor(20, 20, 20);

/// One predicted series, labelled by its regressor.
#[derive(Debug, Clone)]
pub struct PredictionSeries {
    pub regressor: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Date as a fractional calendar year (`2017-01-01` → `2017.0`).
pub fn fractional_year(d: NaiveDate) -> f64 {
    let days_in_year = if d.leap_year() { 366.0 } else { 365.0 };
    d.year() as f64 + (d.ordinal0() as f64) / days_in_year
}

/// Padded `[min, max]` range for an axis; never empty or inverted.
pub fn axis_range(values: impl IntoIterator<Item = f64>, pad_fraction: f64, min_pad: f64) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * pad_fraction).max(min_pad);
    (lo - pad, hi + pad)
}

fn to_xy(points: &[(NaiveDate, f64)]) -> Vec<(f64, f64)> {
    points.iter().map(|&(d, y)| (fractional_year(d), y)).collect()
}

fn draw_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::io(format!("Failed to render chart: {e}"))
}

/// Render the chart to `path`, overwriting any existing file.
pub fn render_predictions_png(
    path: &Path,
    actual: &[(NaiveDate, f64)],
    predictions: &[PredictionSeries],
    font: Option<&Path>,
) -> Result<(), AppError> {
    ensure_font(font)?;

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_chart(&root, actual, predictions)?;
    root.present().map_err(draw_error)?;

    tracing::info!(path = %path.display(), series = predictions.len() + 1, "wrote chart");
    Ok(())
}

/// Draw title, axes, series and legend onto `root`. A font must be registered.
fn draw_chart(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    actual: &[(NaiveDate, f64)],
    predictions: &[PredictionSeries],
) -> Result<(), AppError> {
    let actual_xy = to_xy(actual);
    let predicted_xy: Vec<Vec<(f64, f64)>> = predictions.iter().map(|p| to_xy(&p.points)).collect();

    let all = actual_xy.iter().chain(predicted_xy.iter().flatten());
    let (x0, x1) = axis_range(all.clone().map(|p| p.0), 0.02, 0.5);
    let (y0, y1) = axis_range(all.map(|p| p.1), 0.05, 0.5);

    let year_fmt = |v: &f64| format!("{v:.0}");
    let value_fmt = |v: &f64| format!("{v:.1}");

    root.fill(&WHITE).map_err(draw_error)?;

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(CHART_TITLE, (FONT_FAMILY, 24))
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Life Expectancy")
        .x_labels(10)
        .y_labels(8)
        .x_label_formatter(&year_fmt)
        .y_label_formatter(&value_fmt)
        .label_style((FONT_FAMILY, 16))
        .draw()
        .map_err(draw_error)?;

    // 1) Actual series: drawn once, solid with circle markers.
    chart
        .draw_series(LineSeries::new(actual_xy.iter().copied(), ACTUAL_COLOR.stroke_width(2)))
        .map_err(draw_error)?
        .label("Actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ACTUAL_COLOR.stroke_width(2)));
    chart
        .draw_series(actual_xy.iter().map(|&p| Circle::new(p, 4, ACTUAL_COLOR.filled())))
        .map_err(draw_error)?;

    // 2) One predicted series per regressor, with cross markers.
    for (i, (series, xy)) in predictions.iter().zip(&predicted_xy).enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(xy.iter().copied(), color.stroke_width(2)))
            .map_err(draw_error)?
            .label(format!("Predicted ({})", series.regressor))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart
            .draw_series(xy.iter().map(|&p| Cross::new(p, 5, color.stroke_width(2))))
            .map_err(draw_error)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font((FONT_FAMILY, 16))
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()
        .map_err(draw_error)?;

    Ok(())
}

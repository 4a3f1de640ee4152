//! CSV ingest and renaming.
//!
//! This module turns the merged life-expectancy CSV into a [`Dataset`]:
//! `Year` becomes `ds` (January 1st of that year), `Life expectancy` becomes `y`,
//! and every configured regressor column is carried along by name.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors before anything is written)
//! - **Tolerant headers** (whitespace, BOM and case do not matter)
//! - **No silent row drops**: a malformed cell aborts the load with its line number
//! - **Separation of concerns**: no splitting or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{Dataset, Observation, PipelineConfig};
use crate::error::AppError;

/// Cells treated as missing numeric values.
const MISSING_TOKENS: [&str; 5] = ["na", "nan", "null", "n/a", "none"];

/// Resolved column positions for one input file.
#[derive(Debug, Clone)]
struct ColumnLayout {
    year: usize,
    target: usize,
    regressors: Vec<usize>,
    entity: Option<usize>,
}

/// Load the configured input file.
pub fn load_dataset(config: &PipelineConfig) -> Result<Dataset, AppError> {
    let file = File::open(&config.input).map_err(|e| {
        AppError::data_load(format!("Failed to open CSV '{}': {e}", config.input.display()))
    })?;

    let dataset = read_dataset(file, config)?;
    tracing::info!(
        path = %config.input.display(),
        rows = dataset.len(),
        regressors = ?dataset.regressors,
        "loaded input data"
    );
    Ok(dataset)
}

/// Parse a dataset from any reader (file, in-memory buffer).
pub fn read_dataset<R: Read>(input: R, config: &PipelineConfig) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data_load(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let layout = resolve_layout(config, &header_map)?;

    let mut observations = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = result.map_err(|e| AppError::data_load(format!("CSV parse error on line {line}: {e}")))?;

        if let (Some(col), Some(wanted)) = (layout.entity, config.entity.as_deref()) {
            let value = cell(&record, col).unwrap_or("");
            if !value.eq_ignore_ascii_case(wanted.trim()) {
                continue;
            }
        }

        observations.push(parse_row(&record, &layout, config, line)?);
    }

    tracing::debug!(rows_read, rows_kept = observations.len(), "parsed CSV rows");

    Ok(Dataset {
        regressors: config.regressors.clone(),
        observations,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. The WHO export also ships `Life expectancy ` with a trailing
    // space, so trimming is required for the default schema to resolve.
    let name = name.trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase()
}

fn resolve_layout(config: &PipelineConfig, header_map: &HashMap<String, usize>) -> Result<ColumnLayout, AppError> {
    let year = require_column(header_map, &config.year_column)?;
    let target = require_column(header_map, &config.target_column)?;

    let regressors = config
        .regressors
        .iter()
        .map(|name| {
            header_map
                .get(&normalize_header_name(name))
                .copied()
                .ok_or_else(|| AppError::data_load(format!("Missing regressor column: `{name}`")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let entity = match config.entity {
        Some(_) => Some(
            header_map
                .get(&normalize_header_name(&config.entity_column))
                .copied()
                .ok_or_else(|| {
                    AppError::data_load(format!(
                        "Filter `--entity` requires a `{}` column in the CSV.",
                        config.entity_column
                    ))
                })?,
        ),
        None => None,
    };

    Ok(ColumnLayout {
        year,
        target,
        regressors,
        entity,
    })
}

fn require_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| AppError::data_load(format!("Missing required column: `{name}`")))
}

fn parse_row(
    record: &StringRecord,
    layout: &ColumnLayout,
    config: &PipelineConfig,
    line: usize,
) -> Result<Observation, AppError> {
    let ds = parse_year_date(cell(record, layout.year).unwrap_or(""))
        .map_err(|e| AppError::date_parse(format!("Line {line}: {e}")))?;

    let y = parse_opt_f64(cell(record, layout.target))
        .map_err(|e| AppError::data_load(format!("Line {line}, column `{}`: {e}", config.target_column)))?;

    let regressors = layout
        .regressors
        .iter()
        .zip(&config.regressors)
        .map(|(&col, name)| {
            parse_opt_f64(cell(record, col))
                .map_err(|e| AppError::data_load(format!("Line {line}, column `{name}`: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Observation {
        line,
        ds,
        y,
        regressors,
    })
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim)
}

/// Parse a year-only field (`2017`, also `2017.0`) into January 1st of that year.
pub fn parse_year_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Missing year value.".to_string());
    }

    let year = match s.parse::<i32>() {
        Ok(y) => y,
        Err(_) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i32::MAX as f64 => v as i32,
            _ => return Err(format!("Invalid year '{s}'. Expected an integer year such as 2016.")),
        },
    };

    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| format!("Year '{s}' is out of range."))
}

fn parse_opt_f64(s: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = s else { return Ok(None) };
    if s.is_empty() || MISSING_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return Ok(None);
    }
    let v = s.parse::<f64>().map_err(|_| format!("Invalid number '{s}'."))?;
    if v.is_finite() { Ok(Some(v)) } else { Ok(None) }
}

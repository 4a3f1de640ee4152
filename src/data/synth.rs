//! Synthetic merged-dataset generation.
//!
//! Produces a CSV shaped like the real merged input (`Country,Year,Life expectancy,
//! <regressors...>`) so the pipeline can be exercised without the WHO/World Bank
//! downloads. Each country gets:
//!
//! - a baseline life expectancy and a slow linear improvement per year
//! - one geometric-growth series per regressor
//! - a target that responds to the (log) regressor level, plus Gaussian noise
//!
//! Output is fully determined by the seed.

use std::fs::File;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DEFAULT_ENTITY_COLUMN, DEFAULT_TARGET_COLUMN, DEFAULT_YEAR_COLUMN};
use crate::error::AppError;

/// Settings for `lifecast synth`.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub countries: usize,
    pub start_year: i32,
    pub end_year: i32,
    pub regressors: Vec<String>,
    pub seed: u64,
    /// Standard deviation of the target noise (years of life expectancy).
    pub noise: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            countries: 1,
            start_year: 2000,
            end_year: 2019,
            regressors: vec!["GDP".to_string()],
            seed: 42,
            noise: 0.3,
        }
    }
}

/// One generated input row.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthRow {
    pub country: String,
    pub year: i32,
    pub life_expectancy: f64,
    pub regressors: Vec<f64>,
}

const MAX_YEARS: i64 = 1_000;

/// Generate rows ordered by country, then year.
pub fn generate_rows(config: &SynthConfig) -> Result<Vec<SynthRow>, AppError> {
    if config.countries == 0 {
        return Err(AppError::data_load("Country count must be > 0."));
    }
    if config.end_year < config.start_year {
        return Err(AppError::data_load("End year must not precede start year."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::data_load("Noise must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise)
        .map_err(|e| AppError::data_load(format!("Noise distribution error: {e}")))?;
    let shock = Normal::new(0.0, 0.03).map_err(|e| AppError::data_load(format!("Shock distribution error: {e}")))?;

    let years = i64::from(config.end_year) - i64::from(config.start_year) + 1;
    if years > MAX_YEARS {
        return Err(AppError::data_load(format!("Year range spans {years} years; at most {MAX_YEARS} are supported.")));
    }
    let mut rows = Vec::new();

    for c in 0..config.countries {
        let country = format!("Country {:02}", c + 1);
        let base = rng.gen_range(50.0..75.0);
        let improvement = rng.gen_range(0.1..0.4);

        // Per-regressor level, growth rate and effect on the target.
        let drivers: Vec<(f64, f64, f64)> = config
            .regressors
            .iter()
            .map(|_| {
                (
                    rng.gen_range(100.0..20_000.0),
                    rng.gen_range(0.0..0.06),
                    rng.gen_range(0.5..2.0),
                )
            })
            .collect();

        for (i, year) in (config.start_year..=config.end_year).enumerate() {
            let step = i as f64;
            let mut target = base + improvement * step;
            let mut values = Vec::with_capacity(drivers.len());

            for &(level, growth, effect) in &drivers {
                let value = level * ((growth * step) + shock.sample(&mut rng)).exp();
                target += effect * (value / level).ln();
                values.push(value);
            }
            target += noise.sample(&mut rng);

            rows.push(SynthRow {
                country: country.clone(),
                year,
                life_expectancy: target,
                regressors: values,
            });
        }
    }

    Ok(rows)
}

/// Generate rows and write them as CSV.
pub fn write_synthetic_csv(path: &Path, config: &SynthConfig) -> Result<usize, AppError> {
    let rows = generate_rows(config)?;

    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create synthetic CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec![
        DEFAULT_ENTITY_COLUMN.to_string(),
        DEFAULT_YEAR_COLUMN.to_string(),
        DEFAULT_TARGET_COLUMN.to_string(),
    ];
    header.extend(config.regressors.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| AppError::io(format!("Failed to write synthetic CSV header: {e}")))?;

    for row in &rows {
        let mut record = vec![
            row.country.clone(),
            row.year.to_string(),
            format!("{:.4}", row.life_expectancy),
        ];
        record.extend(row.regressors.iter().map(|v| format!("{v:.4}")));
        writer
            .write_record(&record)
            .map_err(|e| AppError::io(format!("Failed to write synthetic CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush synthetic CSV: {e}")))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "wrote synthetic dataset");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PipelineConfig;
    use crate::io::ingest::load_dataset;

    #[test]
    fn same_seed_same_rows() {
        let config = SynthConfig {
            countries: 3,
            ..SynthConfig::default()
        };
        let a = generate_rows(&config).unwrap();
        let b = generate_rows(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3 * 20);

        let other = generate_rows(&SynthConfig { seed: 7, ..config }).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn rejects_inverted_year_range() {
        let config = SynthConfig {
            start_year: 2010,
            end_year: 2009,
            ..SynthConfig::default()
        };
        assert!(generate_rows(&config).is_err());
    }

    #[test]
    fn extreme_year_bounds_do_not_overflow() {
        let config = SynthConfig {
            start_year: i32::MIN,
            end_year: i32::MAX,
            ..SynthConfig::default()
        };
        assert!(generate_rows(&config).is_err());

        let single = SynthConfig {
            start_year: i32::MAX,
            end_year: i32::MAX,
            ..SynthConfig::default()
        };
        let rows = generate_rows(&single).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, i32::MAX);
    }

    #[test]
    fn written_file_loads_back_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        let config = SynthConfig {
            countries: 2,
            start_year: 2010,
            end_year: 2018,
            regressors: vec!["GDP".to_string(), "Schooling".to_string()],
            ..SynthConfig::default()
        };
        let n = write_synthetic_csv(&path, &config).unwrap();
        assert_eq!(n, 18);

        let pipeline = PipelineConfig::new(&path, dir.path(), config.regressors.clone());
        let ds = load_dataset(&pipeline).unwrap();
        assert_eq!(ds.len(), 18);
        assert!(ds.observations.iter().all(|o| o.y.is_some()));
        assert!(ds.observations.iter().all(|o| o.regressors.iter().all(Option::is_some)));
    }
}

//! Export per-regressor forecast results to CSV.
//!
//! Layout: `ds,yhat,y,Diff`, one row per test observation, with
//! `yhat_lower,yhat_upper` appended when intervals were computed.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::domain::{ForecastRow, IntervalRow};
use crate::error::AppError;

/// File name of the comparison chart inside the output directory.
pub const CHART_FILE_NAME: &str = "prophet_predictions.png";

/// `<dir>/prophet_results_<regressor>.csv`
pub fn results_path(dir: &Path, regressor: &str) -> PathBuf {
    dir.join(format!("prophet_results_{regressor}.csv"))
}

/// `<dir>/prophet_model_<regressor>.json`
pub fn model_path(dir: &Path, regressor: &str) -> PathBuf {
    dir.join(format!("prophet_model_{regressor}.json"))
}

/// Write forecast rows to a CSV file, replacing any existing file.
pub fn write_results_csv(path: &Path, rows: &[ForecastRow], with_intervals: bool) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create results CSV '{}': {e}", path.display())))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    let header: &[&str] = if with_intervals {
        &["ds", "yhat", "y", "Diff", "yhat_lower", "yhat_upper"]
    } else {
        &["ds", "yhat", "y", "Diff"]
    };
    // Written explicitly so an empty test set still yields a header line.
    writer
        .write_record(header)
        .map_err(|e| AppError::io(format!("Failed to write results CSV header: {e}")))?;

    for row in rows {
        let result = if with_intervals {
            let interval = IntervalRow {
                ds: row.ds,
                yhat: row.yhat,
                y: row.y,
                diff: row.diff,
                yhat_lower: row.yhat_lower.unwrap_or(f64::NAN),
                yhat_upper: row.yhat_upper.unwrap_or(f64::NAN),
            };
            writer.serialize(interval)
        } else {
            writer.serialize(row)
        };
        result.map_err(|e| AppError::io(format!("Failed to write results CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush results CSV '{}': {e}", path.display())))?;
    Ok(())
}

/// Read a results CSV back (used to verify exports).
#[cfg(test)]
pub fn read_results_csv(path: &Path) -> Result<Vec<ForecastRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::data_load(format!("Failed to open results CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    reader
        .deserialize::<ForecastRow>()
        .map(|r| r.map_err(|e| AppError::data_load(format!("Invalid results CSV row: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn row(year: i32, yhat: f64, y: f64) -> ForecastRow {
        ForecastRow {
            ds: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            yhat,
            y,
            diff: yhat - y,
            yhat_lower: Some(yhat - 1.0),
            yhat_upper: Some(yhat + 1.0),
        }
    }

    #[test]
    fn file_names_follow_the_regressor() {
        let dir = Path::new("/tmp/out");
        assert_eq!(results_path(dir, "GDP"), Path::new("/tmp/out/prophet_results_GDP.csv"));
        assert_eq!(model_path(dir, "GDP"), Path::new("/tmp/out/prophet_model_GDP.json"));
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        write_results_csv(&path, &[row(2017, 72.5, 72.0), row(2018, 73.0, 73.5)], false).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ds,yhat,y,Diff");
        assert_eq!(lines[1], "2017-01-01,72.5,72.0,0.5");
        assert_eq!(lines[2], "2018-01-01,73.0,73.5,-0.5");
        assert_eq!(lines.len(), 3);

        let back = read_results_csv(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].diff, -0.5);
    }

    #[test]
    fn empty_rows_still_write_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        write_results_csv(&path, &[], false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim_end(), "ds,yhat,y,Diff");
    }

    #[test]
    fn interval_columns_are_appended_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        write_results_csv(&path, &[row(2017, 72.5, 72.0)], true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ds,yhat,y,Diff,yhat_lower,yhat_upper");
        assert_eq!(lines[1], "2017-01-01,72.5,72.0,0.5,71.5,73.5");
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let err = write_results_csv(Path::new("/definitely/not/here/r.csv"), &[], false).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}

//! Read/write fitted model JSON files.
//!
//! A model file is the portable record of one regressor's fit:
//! - which regressor and split produced it
//! - the fitted scales, changepoints and MAP parameters
//! - the held-out MAE (absent for an empty test set)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::FittedModel;
use crate::report::Evaluation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub regressor: String,
    pub split_year: i32,
    pub n_train: usize,
    pub n_test: usize,
    pub mae: Option<f64>,
    pub model: FittedModel,
}

impl ModelFile {
    pub fn from_evaluation(eval: &Evaluation, split_year: i32) -> Self {
        Self {
            tool: "lifecast".to_string(),
            regressor: eval.regressor.clone(),
            split_year,
            n_train: eval.n_train,
            n_test: eval.n_test,
            mae: eval.mae,
            model: eval.model.clone(),
        }
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create model JSON '{}': {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, model)
        .map_err(|e| AppError::io(format!("Failed to write model JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush model JSON '{}': {e}", path.display())))?;
    Ok(())
}

/// Read a model JSON file.
#[cfg(test)]
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::data_load(format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::data_load(format!("Invalid model JSON: {e}")))?;
    Ok(model)
}

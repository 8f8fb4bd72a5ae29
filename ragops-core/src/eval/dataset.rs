//! Golden dataset loading.

use crate::error::EvalError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A fixed question with its expected answer and supporting context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenExample {
    pub question: String,
    pub ground_truth_answer: String,
    #[serde(default)]
    pub ground_truth_context: String,
}

/// Load the golden dataset, a JSON array of [`GoldenExample`].
pub fn load_golden_dataset(path: &Path) -> Result<Vec<GoldenExample>, EvalError> {
    if !path.exists() {
        return Err(EvalError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| EvalError::InvalidDataset {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let examples: Vec<GoldenExample> =
        serde_json::from_str(&content).map_err(|e| EvalError::InvalidDataset {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    if examples.is_empty() {
        return Err(EvalError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }
    info!(path = %path.display(), cases = examples.len(), "Loaded golden dataset");
    Ok(examples)
}

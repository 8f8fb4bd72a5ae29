//! Error types for the RagOps core library.
//!
//! Uses `thiserror` for public API error types. A quality regression is never
//! an error here: it is a [`crate::gate::GateOutcome`]. Everything in this
//! module means "the pipeline is broken", not "the model got worse".

use std::path::PathBuf;

/// Top-level error type for the RagOps core library.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from loading or writing quality reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report not found at {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read report {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report {path} is not valid JSON: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Report {path} has an invalid shape: {message}")]
    InvalidShape { path: PathBuf, message: String },

    #[error("Report {path} has a non-numeric score for '{metric}'")]
    InvalidScore { path: PathBuf, metric: String },

    #[error("Report {path} is missing tracked metrics: {missing}")]
    Incomplete { path: PathBuf, missing: String },

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Tolerance must be a finite, non-negative number, got {value}")]
    InvalidTolerance { value: f64 },

    #[error("Unknown metric '{name}' (expected one of: {expected})")]
    UnknownMetric { name: String, expected: String },

    #[error("Invalid floor '{spec}': {message}")]
    InvalidFloor { spec: String, message: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },

    #[error("No metrics are tracked")]
    NoTrackedMetrics,

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Errors from an evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Golden dataset not found at {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Golden dataset {path} is invalid: {message}")]
    InvalidDataset { path: PathBuf, message: String },

    #[error("Golden dataset {path} contains no test cases")]
    EmptyDataset { path: PathBuf },

    #[error("Answer generation failed: {message}")]
    Generation { message: String },

    #[error("Judge failed on question {index}: {message}")]
    Judge { index: usize, message: String },

    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("Unexpected response from {url}: {message}")]
    ResponseParse { url: String, message: String },

    #[error("Missing API key: environment variable {env_var} is not set")]
    MissingApiKey { env_var: String },

    #[error("No answer source configured (set a generator URL or a recorded answers file)")]
    NoAnswerSource,
}

/// Convenience type alias for Results using [`GateError`].
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GateError::Report(ReportError::NotFound {
            path: PathBuf::from("baseline.json"),
        });
        assert_eq!(
            err.to_string(),
            "Report error: Report not found at baseline.json"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = GateError::Config(ConfigError::InvalidTolerance { value: -0.1 });
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn test_eval_error_conversion() {
        let eval_err = EvalError::EmptyDataset {
            path: PathBuf::from("golden.json"),
        };
        let err: GateError = eval_err.into();
        assert!(matches!(err, GateError::Evaluation(_)));
    }
}

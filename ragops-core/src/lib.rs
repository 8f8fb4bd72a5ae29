//! # ragops-core
//!
//! Quality tooling for a retrieval-augmented chatbot:
//!
//! - [`gate`]: the metrics regression gate run in CI.
//! - [`baseline`]: explicit promotion of a report to the persisted baseline.
//! - [`eval`]: the evaluation run that produces the current report, with
//!   answer generation and judging behind pluggable traits.
//! - [`config`]: layered configuration shared by the CLI.

pub mod baseline;
pub mod config;
pub mod error;
pub mod eval;
pub mod gate;
pub mod metrics;
pub mod report;

pub use config::{RagOpsConfig, load_config};
pub use error::{ConfigError, EvalError, GateError, ReportError};
pub use gate::{GateOutcome, MetricStatus, MetricVerdict, RegressionGate};
pub use metrics::{MISSING_SCORE, Metric, QualityReport};
pub use report::{EvaluationReport, load_report};

use std::path::Path;

/// Load both reports and run the gate.
///
/// Any load failure is returned as an error; the gate never passes on a
/// report it could not read.
pub fn compare_reports(
    gate: &RegressionGate,
    baseline: &Path,
    current: &Path,
) -> Result<GateOutcome, GateError> {
    tracing::info!(path = %baseline.display(), "Loading baseline report");
    let baseline = load_report(baseline)?;
    tracing::info!(path = %current.display(), "Loading current report");
    let current = load_report(current)?;
    Ok(gate.evaluate(&baseline, &current))
}

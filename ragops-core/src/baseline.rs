//! Promotion of a current report to the persisted baseline.
//!
//! The gate never writes the baseline. Promotion is a separate, explicit step
//! run from a trusted path (typically after a merge to trunk).

use crate::error::{GateError, ReportError};
use crate::metrics::{Metric, QualityReport};
use crate::report::{load_report, write_atomic};
use std::path::Path;
use tracing::info;

/// Validate the report at `current` and write its scores to `baseline`.
///
/// Refuses reports that lack any metric in `tracked`; the existing baseline
/// is left untouched on every error path.
pub fn promote(
    current: &Path,
    baseline: &Path,
    tracked: &[Metric],
) -> Result<QualityReport, GateError> {
    let report = load_report(current)?;

    let missing = report.missing(tracked);
    if !missing.is_empty() {
        return Err(ReportError::Incomplete {
            path: current.to_path_buf(),
            missing: missing
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
        .into());
    }

    let json = serde_json::to_string_pretty(&report)?;
    write_atomic(baseline, &json)?;
    info!(
        current = %current.display(),
        baseline = %baseline.display(),
        "Promoted current report to baseline"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{"scores": {
        "faithfulness": 0.82, "answer_relevancy": 0.88,
        "context_recall": 0.80, "context_precision": 0.93
    }, "pass_rate": 100.0}"#;

    #[test]
    fn test_promote_writes_flat_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("evaluation_report.json");
        let baseline = dir.path().join("baseline.json");
        std::fs::write(&current, FULL).unwrap();

        let promoted = promote(&current, &baseline, &Metric::ALL).unwrap();
        assert_eq!(promoted.len(), 4);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&baseline).unwrap()).unwrap();
        assert_eq!(written["faithfulness"], 0.82);
        assert!(written.get("pass_rate").is_none());
    }

    #[test]
    fn test_promote_refuses_incomplete_report() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.json");
        let baseline = dir.path().join("baseline.json");
        std::fs::write(&current, r#"{"faithfulness": 0.9}"#).unwrap();
        std::fs::write(&baseline, r#"{"faithfulness": 0.5}"#).unwrap();

        let err = promote(&current, &baseline, &Metric::ALL).unwrap_err();
        assert!(matches!(
            err,
            GateError::Report(ReportError::Incomplete { .. })
        ));
        assert!(err.to_string().contains("answer_relevancy"));
        assert_eq!(
            std::fs::read_to_string(&baseline).unwrap(),
            r#"{"faithfulness": 0.5}"#
        );
    }

    #[test]
    fn test_promote_refuses_malformed_report() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.json");
        let baseline = dir.path().join("baseline.json");
        std::fs::write(&current, "not json").unwrap();

        assert!(promote(&current, &baseline, &Metric::ALL).is_err());
        assert!(!baseline.exists());
    }
}

//! Loading and writing quality reports.
//!
//! Two on-disk shapes are accepted: the evaluation report envelope written by
//! an evaluation run (`{"scores": {...}, "pass_rate": ...}`) and a flat
//! `metric -> score` mapping. Unknown keys are ignored; anything that would
//! make a tracked score ambiguous is rejected so the gate fails closed.

use crate::error::ReportError;
use crate::metrics::{Metric, QualityReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Full report written by an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub scores: QualityReport,
    pub pass_rate: f64,
    pub num_test_cases: usize,
    pub judge_model: String,
    pub thresholds: BTreeMap<Metric, f64>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub failed_generations: usize,
}

/// Read a quality report from `path`.
pub fn load_report(path: &Path) -> Result<QualityReport, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let report = parse_report(&content, path)?;
    debug!(path = %path.display(), metrics = report.len(), "Loaded quality report");
    Ok(report)
}

/// Parse report JSON. `origin` is only used in error messages.
pub fn parse_report(content: &str, origin: &Path) -> Result<QualityReport, ReportError> {
    let value: Value = serde_json::from_str(content).map_err(|source| ReportError::InvalidJson {
        path: origin.to_path_buf(),
        source,
    })?;

    let Value::Object(top) = value else {
        return Err(shape_error(origin, "expected a JSON object at the top level"));
    };

    let scores = match top.get("scores") {
        Some(Value::Object(scores)) => scores,
        Some(_) => return Err(shape_error(origin, "'scores' must be an object")),
        None => &top,
    };

    let mut report = QualityReport::new();
    for (key, value) in scores {
        let Ok(metric) = key.parse::<Metric>() else {
            debug!(path = %origin.display(), key = %key, "Ignoring untracked key");
            continue;
        };
        match value.as_f64() {
            Some(score) if score.is_finite() => report.set(metric, score),
            _ => {
                return Err(ReportError::InvalidScore {
                    path: origin.to_path_buf(),
                    metric: key.clone(),
                });
            }
        }
    }
    Ok(report)
}

fn shape_error(path: &Path, message: &str) -> ReportError {
    ReportError::InvalidShape {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Write `content` to `path` by way of a sibling temp file and a rename, so a
/// reader never observes a half-written report.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ReportError> {
    let write_err = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp = temp_path(path);
    if let Err(e) = std::fs::write(&tmp, content) {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_err(e));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        warn!(path = %tmp.display(), "Removing temp file after failed rename");
        let _ = std::fs::remove_file(&tmp);
        write_err(e)
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report.json".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write a full evaluation report as pretty JSON.
pub fn save_evaluation_report(path: &Path, report: &EvaluationReport) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| ReportError::InvalidShape {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> &'static Path {
        Path::new("report.json")
    }

    #[test]
    fn test_parse_envelope() {
        let json = r#"{
            "scores": {"faithfulness": 0.8, "answer_relevancy": 0.87},
            "pass_rate": 50.0,
            "judge_model": "gpt-4-turbo"
        }"#;
        let report = parse_report(json, origin()).unwrap();
        assert_eq!(report.get(Metric::Faithfulness), Some(0.8));
        assert_eq!(report.get(Metric::AnswerRelevancy), Some(0.87));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_parse_flat_mapping() {
        let json = r#"{"context_recall": 0.83, "context_precision": 0.95}"#;
        let report = parse_report(json, origin()).unwrap();
        assert_eq!(report.get(Metric::ContextRecall), Some(0.83));
        assert_eq!(report.get(Metric::ContextPrecision), Some(0.95));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let json = r#"{"faithfulness": 0.8, "bleu": "n/a", "latency_ms": 120}"#;
        let report = parse_report(json, origin()).unwrap();
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_integer_score_accepted() {
        let report = parse_report(r#"{"faithfulness": 1}"#, origin()).unwrap();
        assert_eq!(report.get(Metric::Faithfulness), Some(1.0));
    }

    #[test]
    fn test_non_numeric_tracked_score_rejected() {
        let err = parse_report(r#"{"faithfulness": "high"}"#, origin()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidScore { ref metric, .. } if metric == "faithfulness"));
    }

    #[test]
    fn test_null_tracked_score_rejected() {
        let err = parse_report(r#"{"scores": {"context_recall": null}}"#, origin()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidScore { .. }));
    }

    #[test]
    fn test_top_level_array_rejected() {
        let err = parse_report("[0.8, 0.9]", origin()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidShape { .. }));
    }

    #[test]
    fn test_scores_not_object_rejected() {
        let err = parse_report(r#"{"scores": [1, 2]}"#, origin()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidShape { .. }));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = parse_report("{not json", origin()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidJson { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_report(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ReportError::NotFound { .. }));
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("baseline.json");
        write_atomic(&path, r#"{"faithfulness": 0.5}"#).unwrap();
        write_atomic(&path, r#"{"faithfulness": 0.9}"#).unwrap();

        let report = load_report(&path).unwrap();
        assert_eq!(report.get(Metric::Faithfulness), Some(0.9));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_evaluation_report_is_loadable_as_quality_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evaluation_report.json");
        let report = EvaluationReport {
            scores: QualityReport::new()
                .with_score(Metric::Faithfulness, 0.82)
                .with_score(Metric::ContextPrecision, 0.71),
            pass_rate: 50.0,
            num_test_cases: 20,
            judge_model: "gpt-4-turbo".into(),
            thresholds: Metric::ALL.iter().map(|m| (*m, m.default_target())).collect(),
            generated_at: Utc::now(),
            failed_generations: 0,
        };
        save_evaluation_report(&path, &report).unwrap();

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded, report.scores);
    }
}

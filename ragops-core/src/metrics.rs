//! Tracked quality metrics and the quality report they are scored in.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Score used for a tracked metric that is absent from a report.
///
/// A missing metric must never pass silently, so it reads as zero rather than
/// being skipped.
pub const MISSING_SCORE: f64 = 0.0;

/// A RAG quality dimension scored by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Faithfulness,
    AnswerRelevancy,
    ContextRecall,
    ContextPrecision,
}

impl Metric {
    /// Every metric, in report-printing order.
    pub const ALL: [Metric; 4] = [
        Metric::Faithfulness,
        Metric::AnswerRelevancy,
        Metric::ContextRecall,
        Metric::ContextPrecision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Faithfulness => "faithfulness",
            Metric::AnswerRelevancy => "answer_relevancy",
            Metric::ContextRecall => "context_recall",
            Metric::ContextPrecision => "context_precision",
        }
    }

    /// Default absolute target used by the evaluation run.
    pub fn default_target(&self) -> f64 {
        match self {
            Metric::Faithfulness => 0.80,
            Metric::AnswerRelevancy => 0.80,
            Metric::ContextRecall => 0.75,
            Metric::ContextPrecision => 0.70,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownMetric {
                name: s.to_string(),
                expected: Metric::ALL
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Mapping from metric to score, conventionally in `[0.0, 1.0]`.
///
/// Scores are stored as given; nothing here clamps or range-checks them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityReport {
    scores: BTreeMap<Metric, f64>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, metric: Metric, score: f64) -> Self {
        self.scores.insert(metric, score);
        self
    }

    pub fn set(&mut self, metric: Metric, score: f64) {
        self.scores.insert(metric, score);
    }

    /// The recorded score, if any.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.scores.get(&metric).copied()
    }

    /// The score used for comparison: the recorded value or [`MISSING_SCORE`].
    pub fn score(&self, metric: Metric) -> f64 {
        self.get(metric).unwrap_or(MISSING_SCORE)
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.scores.contains_key(&metric)
    }

    /// Metrics from `tracked` that have no recorded score.
    pub fn missing(&self, tracked: &[Metric]) -> Vec<Metric> {
        tracked
            .iter()
            .copied()
            .filter(|m| !self.contains(*m))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.scores.iter().map(|(m, s)| (*m, *s))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl FromIterator<(Metric, f64)> for QualityReport {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Parse a list of metric identifiers, preserving order and dropping repeats.
pub fn parse_metric_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Metric>, ConfigError> {
    let mut metrics = Vec::with_capacity(names.len());
    for name in names {
        let metric: Metric = name.as_ref().parse()?;
        if !metrics.contains(&metric) {
            metrics.push(metric);
        }
    }
    if metrics.is_empty() {
        return Err(ConfigError::NoTrackedMetrics);
    }
    Ok(metrics)
}

//! Evaluation run producing the current quality report the gate consumes.
//!
//! Answer generation and judging are external services. They sit behind the
//! [`AnswerGenerator`] and [`Judge`] traits so the runner and its tests never
//! depend on a concrete provider.

pub mod dataset;
pub mod providers;
pub mod runner;

pub use dataset::{GoldenExample, load_golden_dataset};
pub use runner::{EvaluationOutcome, EvaluationRunner};

use crate::error::EvalError;
use crate::metrics::Metric;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer text used when generation fails, so the dataset keeps its size.
pub const PLACEHOLDER_ANSWER: &str = "ERROR";

/// An answer plus the passages retrieved to support it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    #[serde(default)]
    pub contexts: Vec<String>,
}

impl GeneratedAnswer {
    pub fn placeholder() -> Self {
        Self {
            answer: PLACEHOLDER_ANSWER.to_string(),
            contexts: vec![String::new()],
        }
    }
}

/// One row handed to the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSample {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<String>,
    pub ground_truth: String,
}

/// Per-metric scores returned by a judge for one sample.
pub type JudgeScores = BTreeMap<Metric, f64>;

/// Produces an answer and supporting passages for a question.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, EvalError>;
}

/// Scores an answer against a question and passages.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn score(&self, sample: &EvalSample) -> Result<JudgeScores, EvalError>;

    /// Identifier recorded in the evaluation report.
    fn model_name(&self) -> &str;
}

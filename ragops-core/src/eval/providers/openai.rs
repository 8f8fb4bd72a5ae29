//! LLM-as-judge over an OpenAI-compatible chat completions API.

use super::build_client;
use crate::error::EvalError;
use crate::eval::{EvalSample, Judge, JudgeScores};
use crate::metrics::Metric;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an impartial evaluator of retrieval-augmented answers. \
Score the answer on each metric from 0.0 to 1.0 and reply with a single JSON object \
containing exactly these keys: faithfulness, answer_relevancy, context_recall, context_precision.\n\
- faithfulness: every claim in the answer is supported by the contexts.\n\
- answer_relevancy: the answer addresses the question directly.\n\
- context_recall: the contexts contain the information in the ground truth.\n\
- context_precision: the contexts are relevant to the question.";

/// Judge that asks a chat model for per-metric scores as JSON.
pub struct OpenAiJudge {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiJudge {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, EvalError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature: 0.0,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, sample: &EvalSample) -> Value {
        let contexts = sample
            .contexts
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i + 1, c))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            "Question:\n{}\n\nContexts:\n{}\n\nAnswer:\n{}\n\nGround truth:\n{}",
            sample.question, contexts, sample.answer, sample.ground_truth
        );
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user },
            ],
        })
    }
}

#[async_trait]
impl Judge for OpenAiJudge {
    async fn score(&self, sample: &EvalSample) -> Result<JudgeScores, EvalError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "Sending judge request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(sample))
            .send()
            .await
            .map_err(|e| EvalError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| EvalError::Http {
            url: url.clone(),
            message: format!("Failed to read response body: {e}"),
        })?;
        if !status.is_success() {
            return Err(EvalError::Http {
                url,
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| EvalError::ResponseParse {
            url: url.clone(),
            message: format!("Invalid JSON: {e}"),
        })?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| EvalError::ResponseParse {
                url: url.clone(),
                message: "missing choices[0].message.content".into(),
            })?;

        parse_judge_content(content, &url)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract per-metric scores from the judge's reply.
///
/// Tolerates prose or code fences around the JSON object. Scores are clamped
/// into `[0, 1]`; metrics the judge omitted are left out. `url` is only used
/// in error messages.
pub fn parse_judge_content(content: &str, url: &str) -> Result<JudgeScores, EvalError> {
    let parse_error = |message: String| EvalError::ResponseParse {
        url: url.to_string(),
        message,
    };
    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        return Err(parse_error("no JSON object in judge reply".into()));
    };
    if end < start {
        return Err(parse_error("no JSON object in judge reply".into()));
    }
    let value: Value = serde_json::from_str(&content[start..=end])
        .map_err(|e| parse_error(format!("invalid judge JSON: {e}")))?;

    let mut scores = JudgeScores::new();
    for metric in Metric::ALL {
        match value.get(metric.as_str()).and_then(Value::as_f64) {
            Some(score) if score.is_finite() => {
                scores.insert(metric, score.clamp(0.0, 1.0));
            }
            _ => warn!(metric = %metric, "Judge reply has no usable score"),
        }
    }
    if scores.is_empty() {
        return Err(parse_error("judge reply contains no metric scores".into()));
    }
    Ok(scores)
}

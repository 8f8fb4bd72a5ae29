//! Concrete answer generators and judges.
//!
//! - [`HttpAnswerGenerator`] calls an external RAG service.
//! - [`RecordedAnswers`] replays answers captured earlier.
//! - [`OpenAiJudge`] scores samples with an OpenAI-compatible chat model.
//!
//! Use [`create_generator`] and [`create_judge`] to build them from config.

pub mod http;
pub mod openai;
pub mod recorded;

pub use http::HttpAnswerGenerator;
pub use openai::OpenAiJudge;
pub use recorded::RecordedAnswers;

use super::{AnswerGenerator, Judge};
use crate::config::RagOpsConfig;
use crate::error::EvalError;
use std::sync::Arc;
use std::time::Duration;

/// Build the answer source. A service URL wins over a recorded answers file.
pub fn create_generator(config: &RagOpsConfig) -> Result<Arc<dyn AnswerGenerator>, EvalError> {
    let timeout = Duration::from_secs(config.evaluation.request_timeout_secs);
    if let Some(url) = &config.generator.url {
        return Ok(Arc::new(HttpAnswerGenerator::new(url.clone(), timeout)?));
    }
    if let Some(path) = &config.generator.answers_path {
        return Ok(Arc::new(RecordedAnswers::load(path)?));
    }
    Err(EvalError::NoAnswerSource)
}

/// Build the judge, reading its API key from the configured environment
/// variable.
pub fn create_judge(config: &RagOpsConfig) -> Result<Arc<dyn Judge>, EvalError> {
    let env_var = &config.judge.api_key_env;
    let api_key = std::env::var(env_var).map_err(|_| EvalError::MissingApiKey {
        env_var: env_var.clone(),
    })?;
    let judge = OpenAiJudge::new(
        config.judge.base_url.clone(),
        api_key,
        config.evaluation.judge_model.clone(),
        Duration::from_secs(config.evaluation.request_timeout_secs),
    )?
    .with_temperature(config.judge.temperature);
    Ok(Arc::new(judge))
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, EvalError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EvalError::Http {
            url: String::new(),
            message: format!("Failed to build HTTP client: {e}"),
        })
}

//! Answer generator backed by an external RAG service.

use super::build_client;
use crate::error::EvalError;
use crate::eval::{AnswerGenerator, GeneratedAnswer};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// POSTs `{"question": ...}` and expects `{"answer": ..., "contexts": [...]}`.
pub struct HttpAnswerGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpAnswerGenerator {
    pub fn new(url: String, timeout: Duration) -> Result<Self, EvalError> {
        Ok(Self {
            client: build_client(timeout)?,
            url,
        })
    }
}

#[async_trait]
impl AnswerGenerator for HttpAnswerGenerator {
    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, EvalError> {
        debug!(url = %self.url, "Requesting answer from RAG service");
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "question": question }))
            .send()
            .await
            .map_err(|e| EvalError::Http {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| EvalError::Http {
            url: self.url.clone(),
            message: format!("Failed to read response body: {e}"),
        })?;
        if !status.is_success() {
            return Err(EvalError::Generation {
                message: format!("{} returned HTTP {}: {}", self.url, status.as_u16(), body),
            });
        }

        serde_json::from_str(&body).map_err(|e| EvalError::ResponseParse {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }
}

//! Answers replayed from a file captured during an earlier run.

use crate::error::EvalError;
use crate::eval::{AnswerGenerator, GeneratedAnswer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub contexts: Vec<String>,
}

/// Looks answers up by exact question text.
pub struct RecordedAnswers {
    answers: HashMap<String, GeneratedAnswer>,
}

impl RecordedAnswers {
    pub fn new(records: Vec<RecordedAnswer>) -> Self {
        let answers = records
            .into_iter()
            .map(|r| {
                (
                    r.question,
                    GeneratedAnswer {
                        answer: r.answer,
                        contexts: r.contexts,
                    },
                )
            })
            .collect();
        Self { answers }
    }

    pub fn load(path: &Path) -> Result<Self, EvalError> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::Generation {
            message: format!("Failed to read recorded answers {}: {e}", path.display()),
        })?;
        let records: Vec<RecordedAnswer> =
            serde_json::from_str(&content).map_err(|e| EvalError::Generation {
                message: format!("Invalid recorded answers {}: {e}", path.display()),
            })?;
        let answers = Self::new(records);
        if answers.is_empty() {
            return Err(EvalError::Generation {
                message: format!("Recorded answers file {} is empty", path.display()),
            });
        }
        info!(path = %path.display(), answers = answers.len(), "Loaded recorded answers");
        Ok(answers)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[async_trait]
impl AnswerGenerator for RecordedAnswers {
    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, EvalError> {
        self.answers
            .get(question)
            .cloned()
            .ok_or_else(|| EvalError::Generation {
                message: format!("No recorded answer for question: {question}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let answers = RecordedAnswers::new(vec![RecordedAnswer {
            question: "What is RAG?".into(),
            answer: "Retrieval-augmented generation".into(),
            contexts: vec!["RAG combines retrieval and generation".into()],
        }]);
        let found = answers.generate("What is RAG?").await.unwrap();
        assert_eq!(found.answer, "Retrieval-augmented generation");
        assert!(answers.generate("Unknown?").await.is_err());
    }

    #[test]
    fn test_load_counts_distinct_questions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(
            &path,
            r#"[
                {"question": "q1", "answer": "a1", "contexts": ["c1"]},
                {"question": "q2", "answer": "a2"},
                {"question": "q1", "answer": "a1 again"}
            ]"#,
        )
        .unwrap();
        let answers = RecordedAnswers::load(&path).unwrap();
        assert_eq!(answers.len(), 2);
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, "[]").unwrap();
        let err = RecordedAnswers::load(&path).err().unwrap();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();
        assert!(RecordedAnswers::load(&path).is_err());
    }
}

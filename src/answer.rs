//! Question answering over the embedding store
//!
//! Embed the question, pick the closest chunks, hand them to the model as
//! context along with the question.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DEFAULT_TOP_K;
use crate::error::ClientError;
use crate::openai::OpenAiClient;
use crate::search::SearchError;
use crate::store::{EmbeddingStore, ScoredChunk};

/// Separator between retrieved chunks in the model context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("no embeddings loaded, run the embed command first")]
    EmptyStore,
    #[error(transparent)]
    Provider(#[from] ClientError),
    #[error("similarity search failed: {0}")]
    Search(#[from] SearchError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub message: String,
    /// Retrieved chunks, most similar first
    pub chunks: Vec<String>,
}

/// Join retrieved chunks into the context string sent to the model
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[derive(Debug, Clone)]
pub struct Answerer {
    client: OpenAiClient,
    store: Arc<EmbeddingStore>,
    system_prompt: Arc<str>,
    top_k: usize,
}

impl Answerer {
    pub fn new(client: OpenAiClient, store: EmbeddingStore, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            store: Arc::new(store),
            system_prompt: Arc::from(system_prompt.into()),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }
        if self.store.is_empty() {
            return Err(AnswerError::EmptyStore);
        }

        info!("Answering question: {}", question);
        debug!("Getting question embedding");
        let query = self.client.embed(question).await?;

        let top = self.store.search(&query, self.top_k)?;
        debug!(
            "Top chunk scores: {:?}",
            top.iter().map(|c| c.score).collect::<Vec<_>>()
        );
        let context = build_context(&top);

        debug!("Getting model response");
        let message = self
            .client
            .complete(&self.system_prompt, &context, question)
            .await?;

        Ok(Answer {
            message,
            chunks: top.into_iter().map(|c| c.text).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Credentials};

    fn offline_client() -> OpenAiClient {
        OpenAiClient::new(
            Credentials::new("http://127.0.0.1:9", "sk-test"),
            ClientConfig::default(),
        )
        .unwrap()
    }

    fn scored(text: &str) -> ScoredChunk {
        ScoredChunk {
            index: 0,
            text: text.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn test_build_context_joins_with_blank_line() {
        let context = build_context(&[scored("first"), scored("second")]);
        assert_eq!(context, "first\n\nsecond");
        assert_eq!(build_context(&[]), "");
    }

    #[tokio::test]
    async fn test_blank_question_rejected_before_any_call() {
        let answerer = Answerer::new(offline_client(), EmbeddingStore::default(), "prompt");
        let err = answerer.answer("   ").await.unwrap_err();
        assert!(matches!(err, AnswerError::EmptyQuestion));
    }

    #[tokio::test]
    async fn test_empty_store_rejected_before_any_call() {
        let answerer = Answerer::new(offline_client(), EmbeddingStore::default(), "prompt");
        let err = answerer.answer("What is wealth?").await.unwrap_err();
        assert!(matches!(err, AnswerError::EmptyStore));
    }

    #[test]
    fn test_top_k_at_least_one() {
        let answerer =
            Answerer::new(offline_client(), EmbeddingStore::default(), "prompt").with_top_k(0);
        assert_eq!(answerer.top_k, 1);
    }
}

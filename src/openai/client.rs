//! OpenAI-compatible API client
//!
//! Every call goes through a shared [`RateLimitedCaller`], so the embedding
//! and completion endpoints draw from one rate budget per process.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::types::*;
use crate::common::{RateLimitedCaller, RateLimiter};
use crate::config::{ClientConfig, Credentials};
use crate::error::{ClientError, ClientResult};

/// Client for the embeddings and responses endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    credentials: Credentials,
    http_client: Client,
    caller: RateLimitedCaller,
    config: ClientConfig,
}

impl OpenAiClient {
    /// Create a client with its own rate budget
    pub fn new(credentials: Credentials, config: ClientConfig) -> anyhow::Result<Self> {
        let limiter = RateLimiter::new(config.rate_limiter.clone())?;
        let caller = RateLimitedCaller::new(limiter, config.retry.clone());
        Self::with_caller(credentials, config, caller)
    }

    /// Create a client that shares an existing caller (and its budget)
    pub fn with_caller(
        credentials: Credentials,
        config: ClientConfig,
        caller: RateLimitedCaller,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            credentials,
            http_client,
            caller,
            config,
        })
    }

    pub fn caller(&self) -> &RateLimitedCaller {
        &self.caller
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        self.http_client
            .post(self.credentials.endpoint(endpoint))
            .bearer_auth(self.credentials.api_key())
    }

    /// Embedding vector for `input`
    pub async fn embed(&self, input: &str) -> ClientResult<Vec<f32>> {
        let request = EmbeddingRequest {
            input,
            model: &self.config.embedding_model,
        };
        let body = serde_json::to_vec(&request)?;

        self.caller
            .call_with_retry("embedding", || {
                let builder = self
                    .post("embeddings")
                    .header("Content-Type", "application/json")
                    .body(body.clone());

                async move {
                    let response: EmbeddingResponse = send_json(builder).await?;
                    response.into_first_embedding()
                }
            })
            .await
    }

    /// Model answer to `question`, grounded in `context`, under `instructions`
    pub async fn complete(
        &self,
        instructions: &str,
        context: &str,
        question: &str,
    ) -> ClientResult<String> {
        let input = serde_json::to_string(&QuestionInput {
            context,
            user_question: question,
        })?;
        let request = ResponsesRequest {
            model: &self.config.completion_model,
            reasoning: self
                .config
                .reasoning_effort
                .as_deref()
                .map(|effort| Reasoning { effort }),
            instructions,
            input,
        };
        let body = serde_json::to_vec(&request)?;

        self.caller
            .call_with_retry("completion", || {
                let builder = self
                    .post("responses")
                    .header("Content-Type", "application/json")
                    .body(body.clone());

                async move {
                    let response: ResponsesResponse = send_json(builder).await?;
                    response.output_text()
                }
            })
            .await
    }
}

/// Send one request and decode a JSON body, classifying any failure
async fn send_json<R: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<R> {
    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(error_from_response(status.as_u16(), &text));
    }

    tracing::trace!("Provider response: {}", text);
    serde_json::from_str(&text).map_err(|e| ClientError::Parse(format!("{}: {}", e, text)))
}

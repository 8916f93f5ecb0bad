//! Request and response types for the OpenAI-compatible provider API

use serde::{Deserialize, Serialize};

use crate::error::{classify_message, ClientError, FailureKind};

// ==================== EMBEDDINGS ====================

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub input: &'a str,
    pub model: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// The vector of the first result entry
    pub fn into_first_embedding(self) -> Result<Vec<f32>, ClientError> {
        let first = self.data.into_iter().next().ok_or_else(|| {
            ClientError::BadResponseShape("embedding response has no data entries".to_string())
        })?;

        if first.embedding.is_empty() {
            return Err(ClientError::BadResponseShape(
                "first embedding entry has no vector".to_string(),
            ));
        }
        Ok(first.embedding)
    }
}

// ==================== RESPONSES (COMPLETIONS) ====================

#[derive(Debug, Serialize)]
pub struct ResponsesRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning<'a>>,
    pub instructions: &'a str,
    /// JSON-encoded [`QuestionInput`]
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct Reasoning<'a> {
    pub effort: &'a str,
}

/// What the model sees as user input: retrieved context plus the question
#[derive(Debug, Serialize)]
pub struct QuestionInput<'a> {
    pub context: &'a str,
    #[serde(rename = "userQuestion")]
    pub user_question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ResponsesResponse {
    /// Text of the first `output_text` part of the first `message` item
    ///
    /// Reasoning models put a `reasoning` item ahead of the message, so the
    /// message is located by type rather than by position.
    pub fn output_text(self) -> Result<String, ClientError> {
        let message = self
            .output
            .into_iter()
            .find(|item| item.kind == "message")
            .ok_or_else(|| {
                ClientError::BadResponseShape("response output has no message item".to_string())
            })?;

        message
            .content
            .into_iter()
            .find(|part| part.kind == "output_text")
            .and_then(|part| part.text)
            .ok_or_else(|| {
                ClientError::BadResponseShape(
                    "message item has no output_text content".to_string(),
                )
            })
    }
}

// ==================== ERRORS ====================

#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderError,
}

#[derive(Debug, Deserialize)]
pub struct ProviderError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Turn a non-success response into a classified [`ClientError`]
pub fn error_from_response(status: u16, body: &str) -> ClientError {
    let (code, message) = match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => (parsed.error.code.or(parsed.error.kind), parsed.error.message),
        Err(_) => (None, body.trim().to_string()),
    };

    let err = ClientError::from_status(status, code.clone(), message);
    // No machine-readable code: some proxies only say "quota" in prose
    if code.is_none() && err.kind() != FailureKind::Throttled {
        if let ClientError::Api { message, .. } = &err {
            if classify_message(message) == FailureKind::Throttled {
                return ClientError::Throttled {
                    status,
                    message: message.clone(),
                };
            }
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedding_request_serialization() {
        let req = EmbeddingRequest {
            input: "wealth",
            model: "text-embedding-3-small",
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"input": "wealth", "model": "text-embedding-3-small"}));
    }

    #[test]
    fn test_first_embedding_extracted() {
        let body = json!({"data": [{"embedding": [0.5, 0.25]}, {"embedding": [1.0]}]});
        let resp: EmbeddingResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.into_first_embedding().unwrap(), vec![0.5, 0.25]);
    }

    #[test]
    fn test_empty_embedding_data_is_bad_shape() {
        let resp: EmbeddingResponse = serde_json::from_value(json!({"object": "list"})).unwrap();
        assert!(matches!(
            resp.into_first_embedding(),
            Err(ClientError::BadResponseShape(_))
        ));
    }

    #[test]
    fn test_question_input_uses_camel_case_key() {
        let input = QuestionInput {
            context: "ctx",
            user_question: "why?",
        };
        let encoded = serde_json::to_string(&input).unwrap();
        assert_eq!(encoded, r#"{"context":"ctx","userQuestion":"why?"}"#);
    }

    #[test]
    fn test_output_text_skips_reasoning_item() {
        let body = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [{"type": "output_text", "text": "Build wealth."}]}
            ]
        });
        let resp: ResponsesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.output_text().unwrap(), "Build wealth.");
    }

    #[test]
    fn test_output_text_missing_message_is_bad_shape() {
        let body = json!({"output": [{"type": "reasoning"}]});
        let resp: ResponsesResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            resp.output_text(),
            Err(ClientError::BadResponseShape(_))
        ));
    }

    #[test]
    fn test_output_text_missing_text_part_is_bad_shape() {
        let body = json!({"output": [{"type": "message", "content": [{"type": "refusal"}]}]});
        let resp: ResponsesResponse = serde_json::from_value(body).unwrap();
        assert!(resp.output_text().is_err());
    }

    #[test]
    fn test_error_body_with_quota_code() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        let err = error_from_response(429, body);
        assert_eq!(err.kind(), FailureKind::Throttled);
    }

    #[test]
    fn test_error_body_auth_failure_is_fatal() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = error_from_response(401, body);
        assert_eq!(err.kind(), FailureKind::Fatal);
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[test]
    fn test_plain_text_error_mentioning_rate_limit() {
        let err = error_from_response(403, "proxy: rate limit exceeded for key");
        assert_eq!(err.kind(), FailureKind::Throttled);
    }

    #[test]
    fn test_plain_text_server_error_is_transient() {
        let err = error_from_response(502, "Bad Gateway");
        assert_eq!(err.kind(), FailureKind::Transient);
    }
}

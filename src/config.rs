//! Configuration management
//!
//! Provider credentials come from the environment (a `.env` file is loaded
//! first if present). Everything else is runtime configuration supplied by
//! the CLI, with defaults here.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::common::{RateLimiterConfig, RetryPolicy};

pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const EMBEDDING_MODEL_VAR: &str = "OPENAI_EMBEDDING_MODEL";
pub const COMPLETION_MODEL_VAR: &str = "OPENAI_COMPLETION_MODEL";

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_REASONING_EFFORT: &str = "low";

/// Number of retrieved chunks handed to the model as context
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("environment variable {0} is empty")]
    EmptyVar(&'static str),
}

/// Provider endpoint and key
#[derive(Clone)]
pub struct Credentials {
    base_url: String,
    api_key: String,
}

impl Credentials {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create credentials from environment variables
    ///
    /// Looks for `OPENAI_BASE_URL` and `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(require_var(BASE_URL_VAR)?, require_var(API_KEY_VAR)?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Full URL for an endpoint path such as `embeddings`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

// Keep the key out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    let value = std::env::var(name).map_err(|_| ConfigError::MissingVar(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyVar(name));
    }
    Ok(value)
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Provider client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout; the retry loop itself never times out a request
    pub timeout: Duration,
    pub embedding_model: String,
    pub completion_model: String,
    pub reasoning_effort: Option<String>,
    pub rate_limiter: RateLimiterConfig,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            reasoning_effort: Some(DEFAULT_REASONING_EFFORT.to_string()),
            rate_limiter: RateLimiterConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Apply model overrides from the environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(model) = optional_var(EMBEDDING_MODEL_VAR) {
            self.embedding_model = model;
        }
        if let Some(model) = optional_var(COMPLETION_MODEL_VAR) {
            self.completion_model = model;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: f64, requests_per_minute: usize) -> Self {
        self.rate_limiter = self
            .rate_limiter
            .with_rate(requests_per_second)
            .with_per_minute(requests_per_minute);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.retry = self.retry.with_max_retries(retries);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }
}

/// Layout of the data directory
///
/// ```text
/// data/
///   chunks/<name>.json       pending chunks, a JSON array of strings
///   embeddings/<name>.json   embedded chunks with their vectors
///   prompts/sys_prompt.txt   persona instructions for the model
/// ```
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn embeddings_dir(&self) -> PathBuf {
        self.root.join("embeddings")
    }

    pub fn default_prompt(&self) -> PathBuf {
        self.root.join("prompts").join("sys_prompt.txt")
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let creds = Credentials::new("https://api.example.com/v1/", "sk-test");
        assert_eq!(creds.base_url(), "https://api.example.com/v1");
        assert_eq!(
            creds.endpoint("embeddings"),
            "https://api.example.com/v1/embeddings"
        );
        assert_eq!(
            creds.endpoint("/responses"),
            "https://api.example.com/v1/responses"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = Credentials::new("https://api.example.com", "sk-secret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("api.example.com"));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::default()
            .with_timeout(Duration::from_secs(30))
            .with_rate_limit(1.0, 5)
            .with_max_retries(4);

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limiter.requests_per_second, 1.0);
        assert_eq!(config.rate_limiter.requests_per_minute, 5);
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::new("/srv/data");
        assert_eq!(paths.chunks_dir(), PathBuf::from("/srv/data/chunks"));
        assert_eq!(paths.embeddings_dir(), PathBuf::from("/srv/data/embeddings"));
        assert_eq!(
            paths.default_prompt(),
            PathBuf::from("/srv/data/prompts/sys_prompt.txt")
        );
    }
}

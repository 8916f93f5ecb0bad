//! Error types for outbound provider calls
//!
//! Every failure carries a machine-readable [`FailureKind`] that the retry
//! loop uses to pick a recovery strategy. The kind is derived from the HTTP
//! status and the provider's error code where those exist; message text is
//! only consulted for errors that arrive without either.

use thiserror::Error;

/// How a failed attempt should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Provider signalled rate limiting or quota exhaustion - back off exponentially
    Throttled,
    /// Any other recoverable failure - retry after a fixed short delay
    Transient,
    /// Retrying cannot help (bad credentials, malformed request, bad response shape)
    Fatal,
}

/// Provider error codes that mean "slow down" rather than "broken"
const THROTTLE_CODES: &[&str] = &["rate_limit_exceeded", "insufficient_quota", "quota_exceeded"];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Rate limited by provider ({status}): {message}")]
    Throttled { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The response decoded but did not have the structure we index into
    #[error("Unexpected response shape: {0}")]
    BadResponseShape(String),

    #[error("Max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Build an error from a non-success HTTP response
    ///
    /// `code` is the provider's machine-readable error code, if the body had one.
    pub fn from_status(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let throttled = status == 429
            || code
                .as_deref()
                .map(|c| THROTTLE_CODES.contains(&c))
                .unwrap_or(false);

        if throttled {
            Self::Throttled { status, message }
        } else {
            Self::Api {
                status,
                code,
                message,
            }
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Throttled { .. } => FailureKind::Throttled,
            Self::Api { status, .. } => match status {
                408 | 500..=599 => FailureKind::Transient,
                _ => FailureKind::Fatal,
            },
            Self::Network(_) | Self::Timeout(_) => FailureKind::Transient,
            Self::Parse(_) | Self::BadResponseShape(_) => FailureKind::Fatal,
            Self::MaxRetriesExceeded { .. } => FailureKind::Fatal,
        }
    }

    /// True when the caller gave up because the provider kept throttling
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Throttled { .. } => true,
            Self::MaxRetriesExceeded { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }
}

/// Fallback classification by message text, for provider errors without a code
///
/// Case-insensitive match on "rate limit" or "quota".
pub fn classify_message(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("quota") {
        FailureKind::Throttled
    } else {
        FailureKind::Transient
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), None, err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

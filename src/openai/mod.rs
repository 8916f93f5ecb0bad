//! OpenAI-compatible provider integration
//!
//! Embeddings (`POST {base}/embeddings`) and completions
//! (`POST {base}/responses`), both paced and retried by
//! [`RateLimitedCaller`](crate::common::RateLimitedCaller).
//!
//! ```no_run
//! use persona_rag::config::{ClientConfig, Credentials};
//! use persona_rag::openai::OpenAiClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OpenAiClient::new(Credentials::from_env()?, ClientConfig::default())?;
//!     let vector = client.embed("What is wealth?").await?;
//!     println!("{} dimensions", vector.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod types;

pub use client::OpenAiClient;
pub use types::error_from_response;

//! Persona RAG
//!
//! A small retrieval-augmented question-answering service. Quotes are
//! embedded through an OpenAI-compatible API and kept in flat JSON files; a
//! question is answered by retrieving the closest quotes and handing them to
//! a language model that speaks in a configured persona.
//!
//! Every outbound call goes through [`common::RateLimitedCaller`], which
//! enforces a requests-per-second spacing and a requests-per-minute sliding
//! window, and retries failures by kind: exponential backoff when the
//! provider throttles, a fixed delay for other transient errors.
//!
//! ```no_run
//! use persona_rag::answer::Answerer;
//! use persona_rag::config::{ClientConfig, Credentials, DataPaths};
//! use persona_rag::openai::OpenAiClient;
//! use persona_rag::store::EmbeddingStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let paths = DataPaths::default();
//!     let client = OpenAiClient::new(Credentials::from_env()?, ClientConfig::default())?;
//!     let store = EmbeddingStore::load(paths.embeddings_dir())?;
//!     let answerer = Answerer::new(client, store, "Answer from the context only.");
//!
//!     let answer = answerer.answer("How do I get rich without getting lucky?").await?;
//!     println!("{}", answer.message);
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod common;
pub mod config;
pub mod error;
pub mod ingest;
pub mod openai;
pub mod prompt;
pub mod search;
pub mod server;
pub mod store;

pub use answer::{Answer, Answerer};
pub use common::{RateLimitedCaller, RateLimiter, RateLimiterConfig, RetryPolicy};
pub use error::{ClientError, FailureKind};

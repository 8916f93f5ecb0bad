//! Serve command implementation

use anyhow::{Context, Result};
use persona_rag::answer::Answerer;
use persona_rag::config::{ClientConfig, Credentials, DataPaths};
use persona_rag::openai::OpenAiClient;
use persona_rag::prompt::load_system_prompt;
use persona_rag::server::{self, AppState};
use persona_rag::store::EmbeddingStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug)]
pub struct ServeArgs {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub prompt: Option<PathBuf>,
    pub rps: f64,
    pub rpm: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

pub fn run(args: ServeArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(args))
}

async fn run_async(args: ServeArgs) -> Result<()> {
    let credentials = Credentials::from_env()
        .context("Failed to load provider credentials from environment")?;
    info!("Provider: {}", credentials.base_url());

    let config = ClientConfig::default()
        .with_env_overrides()
        .with_rate_limit(args.rps, args.rpm)
        .with_max_retries(args.max_retries)
        .with_timeout(Duration::from_secs(args.timeout_secs));
    info!(
        "Models: embedding={}, completion={}; budget {} req/s, {} req/min, {} attempts",
        config.embedding_model,
        config.completion_model,
        args.rps,
        args.rpm,
        config.retry.max_retries
    );
    let client = OpenAiClient::new(credentials, config)?;

    let paths = DataPaths::new(&args.data_dir);
    let store = EmbeddingStore::load(paths.embeddings_dir())?;
    if store.is_empty() {
        warn!("No embeddings loaded, every question will fail until `embed` has been run");
    }

    let prompt = load_system_prompt(args.prompt.as_deref(), &paths.default_prompt())?;
    let answerer = Answerer::new(client, store, prompt);

    server::serve(args.bind, Arc::new(AppState { answerer })).await
}

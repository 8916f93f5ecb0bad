//! Embed command implementation

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use persona_rag::config::{ClientConfig, Credentials, DataPaths};
use persona_rag::ingest::{ChunkOutcome, EmbedRun};
use persona_rag::openai::OpenAiClient;
use std::path::PathBuf;
use tracing::info;

pub fn run(
    chunk_file: String,
    count: usize,
    data_dir: PathBuf,
    rps: f64,
    rpm: usize,
    max_retries: u32,
) -> Result<()> {
    dotenv::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(chunk_file, count, data_dir, rps, rpm, max_retries))
}

async fn run_async(
    chunk_file: String,
    count: usize,
    data_dir: PathBuf,
    rps: f64,
    rpm: usize,
    max_retries: u32,
) -> Result<()> {
    let credentials = Credentials::from_env()
        .context("Failed to load provider credentials from environment")?;
    let config = ClientConfig::default()
        .with_env_overrides()
        .with_rate_limit(rps, rpm)
        .with_max_retries(max_retries);
    let client = OpenAiClient::new(credentials, config)?;
    let paths = DataPaths::new(data_dir);

    info!("Starting embedding run for {}", chunk_file);

    let run = EmbedRun::prepare(&paths, &chunk_file, count)?;
    let pb = ProgressBar::new(run.batch_len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█░ "),
    );

    let mut failed = 0usize;
    let report = run
        .execute(&client, |_, outcome| {
            if let ChunkOutcome::Failed(_) = outcome {
                failed += 1;
                pb.set_message(format!("{} failed", failed));
            }
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    println!("\n{}", "=".repeat(60));
    println!("EMBEDDING RUN");
    println!("{}", "=".repeat(60));
    println!("Chunks attempted:   {}", report.attempted);
    println!("Embedded:           {}", report.embedded);
    println!("Failed (re-queued): {}", report.failed);
    println!("Remaining:          {}", report.remaining);
    println!("Total in store:     {}", report.total_embedded);
    println!("{}", "=".repeat(60));

    Ok(())
}

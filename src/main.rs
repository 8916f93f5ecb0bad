//! Persona RAG - main entry point
//!
//! This binary provides two subcommands:
//! - serve: Run the question-answering HTTP service
//! - embed: Embed pending chunks into the flat-file store

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "persona-rag")]
#[command(about = "Retrieval-augmented persona Q&A over embedded quotes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Data directory holding chunks/, embeddings/ and prompts/
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// System prompt file (default: <data-dir>/prompts/sys_prompt.txt)
        #[arg(short, long)]
        prompt: Option<PathBuf>,

        /// Minimum spacing between provider calls, as calls per second
        #[arg(long, default_value = "2")]
        rps: f64,

        /// Maximum provider calls in any 60-second window
        #[arg(long, default_value = "5")]
        rpm: usize,

        /// Attempts per provider call, including the first
        #[arg(long, default_value = "3")]
        max_retries: u32,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,
    },

    /// Embed chunks from a chunk file
    Embed {
        /// Chunk file name under <data-dir>/chunks/. E.g., "rich.json"
        chunk_file: String,

        /// Number of chunks to process in this run
        count: usize,

        /// Data directory holding chunks/ and embeddings/
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Minimum spacing between provider calls, as calls per second
        #[arg(long, default_value = "1")]
        rps: f64,

        /// Maximum provider calls in any 60-second window
        #[arg(long, default_value = "5")]
        rpm: usize,

        /// Attempts per chunk, including the first
        #[arg(long, default_value = "3")]
        max_retries: u32,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Serve { .. } => ("serve", false),
        Commands::Embed { .. } => ("embed", true),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Serve {
            bind,
            data_dir,
            prompt,
            rps,
            rpm,
            max_retries,
            timeout,
        } => commands::serve::run(commands::serve::ServeArgs {
            bind,
            data_dir,
            prompt,
            rps,
            rpm,
            max_retries,
            timeout_secs: timeout,
        }),

        Commands::Embed {
            chunk_file,
            count,
            data_dir,
            rps,
            rpm,
            max_retries,
        } => commands::embed::run(chunk_file, count, data_dir, rps, rpm, max_retries),
    }
}

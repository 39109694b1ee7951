//! Main entry point for the WordFlux batch DOCX translator

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod core;
mod processors;

/// WordFlux - batch DOCX translation with rate-limited concurrent dispatch
#[derive(Parser, Debug)]
#[command(name = "wordflux", version, about, long_about = None)]
struct Args {
    /// Input DOCX file or directory of DOCX files
    input: PathBuf,

    /// Output directory for translated files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_PKG_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let code = cli::commands::handle_translate(args.input, args.output_dir, args.config).await?;
    std::process::exit(code);
}

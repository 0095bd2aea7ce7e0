//! Sleuth CLI — interactive deep-research shell.
//!
//! Asks for a query, runs it through the research pipeline, prints the report
//! and its sources, and optionally saves the report to disk.

mod markdown;
mod shell;
mod spinner;

use clap::Parser;
use sleuth_core::error::{ConfigError, SleuthError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Sleuth: clarify, research, and cite from one prompt
#[derive(Parser, Debug)]
#[command(name = "sleuth", version, about, long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let _cli = Cli::parse();

    // Human-readable layer for stderr, quiet unless SLEUTH_LOG says otherwise
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_env("SLEUTH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "sleuth", "sleuth")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sleuth.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    match run().await {
        Ok(outcome) => {
            info!(?outcome, "Session finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {e:#}");
            let code = e
                .downcast_ref::<SleuthError>()
                .map(SleuthError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run() -> anyhow::Result<shell::ShellOutcome> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config = sleuth_core::config::load_config(Some(&workspace), None).map_err(|e| {
        SleuthError::from(ConfigError::ParseError {
            message: e.to_string(),
        })
    })?;
    for warning in config.validate() {
        warn!("{}", warning);
    }

    let client = sleuth_core::create_client(&config.llm).map_err(SleuthError::from)?;
    let input = Arc::new(shell::LineReader::new(tokio::io::BufReader::new(
        tokio::io::stdin(),
    )));

    Ok(shell::run(&config, client, input).await?)
}

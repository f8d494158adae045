//! # Sieve - batch part filter
//!
//! ## Usage
//!
//! ```bash
//! # Filter batches from a file into stdout
//! sieve run -c filter.toml -i batches.jsonl
//!
//! # Check and inspect a config
//! sieve lint -c filter.toml
//! sieve sanitize -c filter.toml
//!
//! # Show available processor and condition types
//! sieve list
//! ```
//!
//! Logs go to stderr; stdout carries output batches.

use clap::Parser;
use sieve::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SIEVE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SIEVE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sieve=info,sieve_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

//! # Sieve CLI Module
//!
//! ## Available Commands
//!
//! - `run` - Filter JSON-lines batches through the configured stage
//! - `lint` - Check that a config builds
//! - `sanitize` - Print the documented form of a config
//! - `list` - List registered processor and condition types

mod commands;

use clap::{Parser, Subcommand};
use sieve_core::SieveError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Sieve - per-part batch filter
///
/// Reads batches of message parts, drops the parts that fail a condition
/// and writes the surviving batches back out.
#[derive(Parser, Debug)]
#[command(name = "sieve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter batches read from a file or stdin
    Run {
        /// Path to the config file (TOML, or JSON with a .json extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Input file or pipe with one JSON batch per line (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of batches processed concurrently
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Print counter values to stderr when finished
        #[arg(short, long)]
        metrics: bool,
    },

    /// Check that a config builds without running it
    Lint {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print a config reduced to the sections its types read
    Sanitize {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List registered processor and condition types
    List,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SieveError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Run {
            config,
            input,
            output,
            workers,
            metrics,
        } => cmd_run(&config, input.as_deref(), output.as_deref(), workers, metrics).await,
        Commands::Lint { config } => cmd_lint(&config, json_mode),
        Commands::Sanitize { config } => cmd_sanitize(&config),
        Commands::List => cmd_list(json_mode),
    }
}

//! Cadence CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a starter config
//! - `ingest`   — Feed JSONL events through the runtime
//! - `patterns` — List learned patterns
//! - `predict`  — Predict the next action for a tail
//! - `relevant` — Show the most relevant files
//! - `hooks`    — Show configured hook bindings
//! - `prune`    — Apply snapshot retention
//! - `status`   — Show paths and learned state

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "cadence",
    about = "Cadence — learns assistant workflow patterns and fires hooks ahead of them",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output and JSON logs
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write .cadence/config.toml with defaults
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Stream JSONL events through the runtime (stdin when no file is given)
    Ingest {
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Project profile (JSON) used to tune thresholds
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// How long to wait for running hooks before shutting down
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
    },

    /// List learned patterns from the latest snapshot
    Patterns {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Predict the next action kind after the given tail (oldest first)
    Predict {
        #[arg(required = true)]
        kinds: Vec<String>,
    },

    /// Show the most relevant files
    Relevant {
        #[arg(short, default_value_t = 10)]
        k: usize,
    },

    /// Show configured hook bindings
    Hooks,

    /// Delete expired and excess snapshots
    Prune,

    /// Show paths and learned state
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let json = cli.json;
    match cli.command {
        Commands::Init { force } => commands::init::run(force, json)?,
        Commands::Ingest {
            file,
            profile,
            wait_ms,
        } => commands::ingest::run(file, profile, wait_ms, json).await?,
        Commands::Patterns { limit } => commands::patterns::run(limit, json)?,
        Commands::Predict { kinds } => commands::predict::run(kinds, json)?,
        Commands::Relevant { k } => commands::relevant::run(k, json)?,
        Commands::Hooks => commands::hooks::run(json)?,
        Commands::Prune => commands::prune::run(json)?,
        Commands::Status => commands::status::run(json)?,
    }

    Ok(())
}

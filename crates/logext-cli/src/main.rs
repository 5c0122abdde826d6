//! logext CLI - inspect and maintain `.logext` log directories

use anyhow::Result;
use clap::{Parser, Subcommand};
use logext::LogLevel;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "logext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records stored in a log file
    Inspect {
        /// Path to the .logext file
        file: PathBuf,

        /// Hide records below this level (name or number)
        #[arg(short = 'l', long, default_value = "verbose")]
        min_level: LogLevel,

        /// Show at most this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Order by occurrence count, highest first
        #[arg(long)]
        by_count: bool,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize every log file in a directory
    Stats {
        /// Log directory
        #[arg(default_value = "./logs")]
        dir: PathBuf,
    },

    /// Delete all but the newest log files
    Sweep {
        /// Log directory
        dir: PathBuf,

        /// Number of files to keep
        #[arg(short, long, default_value_t = 10)]
        keep: usize,

        /// Only list the files that would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Inspect {
            file,
            min_level,
            limit,
            by_count,
            json,
        } => {
            let options = commands::inspect::InspectOptions {
                min_level,
                limit,
                by_count,
                json,
            };
            commands::inspect::execute(file, options)?;
        }
        Commands::Stats { dir } => {
            commands::stats::execute(dir)?;
        }
        Commands::Sweep { dir, keep, dry_run } => {
            commands::sweep::execute(dir, keep, dry_run)?;
        }
    }

    Ok(())
}

// src/cli/mod.rs — Command-line interface definitions

pub mod export;
pub mod run;
pub mod schedule;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convogen", version, about = "Synthetic customer-service chatlog pipeline")]
pub struct Cli {
    /// Path to a config file (default: ~/.convogen/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate and evaluate conversations over a date range
    Run {
        /// First day of the range (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start_date: NaiveDate,
        /// Last day of the range (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end_date: NaiveDate,
        /// Support agent persona name used in transcripts
        #[arg(long, default_value = "Riley")]
        agent: String,
        /// Model id; overrides [models] in the config
        #[arg(short, long)]
        model: Option<String>,
        /// Who requested this run (recorded with the session)
        #[arg(long)]
        requested_by: String,
        /// SQLite database to persist accepted conversations into
        #[arg(long)]
        db: Option<PathBuf>,
        /// Write the run's accepted items as CSV on completion
        #[arg(long)]
        csv_out: Option<PathBuf>,
    },
    /// Preview the work-unit schedule for a date range
    Schedule {
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: NaiveDate,
    },
    /// Export previously persisted conversations as CSV
    Export {
        /// SQLite database written by a previous run
        #[arg(long)]
        db: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

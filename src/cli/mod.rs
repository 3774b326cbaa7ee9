//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

pub mod commands;
pub mod output;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "careermap",
    version,
    about = "Semantic job search with query rewriting and chart aggregates"
)]
pub struct Cli {
    /// Path to a config file (defaults to ./careermap.toml and the global config)
    #[arg(long, global = true, env = "CAREERMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Machine-readable JSON output and JSON logs
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Silence all logs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

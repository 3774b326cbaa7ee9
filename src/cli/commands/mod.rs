//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod batch;
pub mod config;
pub mod search;

use crate::app::AppContext;
use crate::error::Result;

pub async fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args).await,
        Commands::Batch(args) => batch::run(ctx, args).await,
        Commands::Config(args) => config::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search jobs for a free-text query
    Search(search::SearchArgs),

    /// Answer JSON-lines search requests from a file or stdin
    Batch(batch::BatchArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),
}

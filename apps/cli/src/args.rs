use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "token-counter")]
#[command(about = "Estimates chat token usage per model against a rolling quota window")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding the counter database and config
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of <data-dir>/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show usage, quota and reset time for every tracked model (default)
    Status {
        /// Model to mark as active
        #[arg(short, long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count a saved page snapshot as one turn and persist the result
    #[command(after_help = "Example: token-counter replay page.json --model \"3 Opus\"")]
    Replay {
        /// JSON page snapshot
        snapshot: PathBuf,

        /// Override the model recorded in the snapshot
        #[arg(short, long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

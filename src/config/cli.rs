use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "topsis")]
#[command(about = "Validate a decision matrix and rank it with a TOPSIS scoring service")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the scoring service base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Submit a decision matrix for ranking
    Submit(SubmitArgs),
    /// Check that the scoring service is reachable
    Health,
    /// Write the bundled sample decision matrix
    Sample {
        #[arg(short, long, default_value = "sample_input.csv")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    /// Decision matrix; first column identifies the alternative
    #[arg(short, long)]
    pub file: PathBuf,

    /// Comma separated weights, one per criterion (e.g. 1,1,1,1)
    #[arg(short, long, allow_hyphen_values = true)]
    pub weights: String,

    /// Comma separated impacts, '+' or '-' per criterion (e.g. +,+,-,+)
    #[arg(short, long, allow_hyphen_values = true)]
    pub impacts: String,

    /// Mail a link to the result
    #[arg(long)]
    pub notify: bool,

    /// Recipient for --notify
    #[arg(long)]
    pub email: Option<String>,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "minefleet",
    version,
    about = "Multi-coin mining pool portal",
    long_about = "Operates a fleet of per-coin mining pool workers from a single supervisor \
                 and durably records the economic outcome of every share and found block."
)]
pub struct Args {
    /// Portal configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of the compact human format
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the portal: worker fleet, accounting, and control interface
    Start {
        /// Record to an in-process ledger instead of Redis (local testing)
        #[arg(long)]
        memory_ledger: bool,
    },

    /// Validate a portal configuration and its pool definitions
    Config {
        /// Configuration file to validate (defaults to --config)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Show the accepted pool set
        #[arg(long)]
        show: bool,
    },

    /// Send an operator command to a running portal
    Command {
        /// Command name (blocknotify, reloadpool, ...)
        name: String,

        /// Positional command parameters
        params: Vec<String>,

        /// Control port (defaults to the configured cli port)
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Args {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

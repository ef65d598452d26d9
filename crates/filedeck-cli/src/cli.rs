//! CLI argument definitions.

use clap::Parser;

use crate::commands::Command;

/// Browse, share and manage files on a PocketBase-style backend.
#[derive(Parser, Debug)]
#[command(name = "filedeck")]
#[command(author, version = env!("FILEDECK_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

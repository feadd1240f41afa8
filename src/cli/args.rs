//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// regioncache - inspect and maintain persisted cache snapshots
///
/// Works on the JSON snapshot a TTL backend mirrors its table to.
#[derive(Parser, Debug)]
#[command(name = "regioncache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REGIONCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot file (defaults to cache.persistence_path from config)
    #[arg(short, long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List entries in the snapshot
    Inspect(InspectArgs),

    /// Print the value stored under a key
    Get(KeyArgs),

    /// Remove a key from the snapshot
    Delete(KeyArgs),

    /// Remove expired entries from the snapshot
    Purge,

    /// Remove every entry from the snapshot
    Clear(ClearArgs),

    /// Show entry counts and age information
    Stats,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Include expired entries
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for commands that address a single key
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Cache key
    pub key: String,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for the inspect command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Keys only, one per line
    Plain,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_snapshot_after_subcommand() {
        let cli = Cli::parse_from(["regioncache", "get", "k", "--snapshot", "/tmp/c.json"]);
        assert_eq!(cli.snapshot, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Commands::Get(KeyArgs { ref key }) if key == "k"));
    }
}

//! regioncache - cache snapshot maintenance
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use regioncache::cli::commands;
use regioncache::cli::{Cli, Commands, LogFormat};
use regioncache::config::ConfigManager;
use regioncache::error::CacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("regioncache=warn"),
        1 => EnvFilter::new("regioncache=info"),
        _ => EnvFilter::new("regioncache=debug"),
    };

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Config errors are reported before logging is up; format falls back to text
    let config = manager.load_with_env().await;
    let log_format = cli.log_format.unwrap_or(match &config {
        Ok(c) if c.general.log_format == "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });

    match log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .without_time()
            .init(),
    }

    let config = config?;
    let snapshot = commands::snapshot_path(cli.snapshot.as_deref(), &config);
    debug!("Using snapshot {}", snapshot.display());

    match cli.command {
        Commands::Inspect(args) => commands::inspect(args, &config, &snapshot),
        Commands::Get(args) => commands::get(args, &config, &snapshot),
        Commands::Delete(args) => commands::delete(args, &config, &snapshot),
        Commands::Purge => commands::purge(&config, &snapshot),
        Commands::Clear(args) => commands::clear(args, &config, &snapshot),
        Commands::Stats => commands::stats(&config, &snapshot),
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}

//! Inspect command - list snapshot entries

use crate::cache::EntryInfo;
use crate::cli::args::{InspectArgs, OutputFormat};
use crate::cli::commands::open_snapshot;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};
use console::style;
use serde_json::Value;
use std::path::Path;

/// Execute the inspect command
pub fn execute(args: InspectArgs, config: &Config, snapshot: &Path) -> CacheResult<()> {
    let backend = open_snapshot(snapshot, config)?;

    let entries: Vec<_> = backend
        .entries()
        .into_iter()
        .rev()
        .filter(|e| args.all || !e.expired)
        .collect();

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cache entries");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[EntryInfo<Value>]) {
    println!(
        "{:<48} {:<9} {:<20} {:<30}",
        style("KEY").bold(),
        style("STATE").bold(),
        style("INSERTED").bold(),
        style("VALUE").bold()
    );
    println!("{}", "-".repeat(110));

    for entry in entries {
        let state = if entry.expired {
            style("expired").dim()
        } else {
            style("live").green()
        };
        let inserted = entry.inserted_at.format("%Y-%m-%d %H:%M:%S").to_string();

        println!(
            "{:<48} {:<9} {:<20} {:<30}",
            truncate(&entry.key, 48),
            state,
            inserted,
            truncate(&entry.value.to_string(), 30)
        );
    }

    println!();
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

fn print_json(entries: &[EntryInfo<Value>]) -> CacheResult<()> {
    let json: Vec<Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "key": e.key,
                "value": e.value,
                "inserted_at": e.inserted_at.to_rfc3339(),
                "expires_at": e.expires_at.to_rfc3339(),
                "expired": e.expired,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_plain(entries: &[EntryInfo<Value>]) {
    for entry in entries {
        println!("{}", entry.key);
    }
}

/// Shorten to at most `max` characters, marking the cut with an ellipsis
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

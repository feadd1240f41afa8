//! Get and delete commands - address a single key

use crate::cache::{CacheBackend, Lookup};
use crate::cli::args::KeyArgs;
use crate::cli::commands::open_snapshot;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::ui::{self, UiContext};
use std::path::Path;

/// Print the live value stored under a key as JSON
pub fn get(args: KeyArgs, config: &Config, snapshot: &Path) -> CacheResult<()> {
    let backend = open_snapshot(snapshot, config)?;

    match backend.get(&args.key) {
        Lookup::Found(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Lookup::NotFound => Err(CacheError::KeyNotFound(args.key)),
    }
}

/// Remove a key and rewrite the snapshot
pub fn delete(args: KeyArgs, config: &Config, snapshot: &Path) -> CacheResult<()> {
    let backend = open_snapshot(snapshot, config)?;

    if !backend.entries().iter().any(|e| e.key == args.key) {
        return Err(CacheError::KeyNotFound(args.key));
    }

    backend.delete(&args.key)?;

    let ctx = UiContext::detect();
    ui::step_ok(&ctx, &format!("Deleted {}", args.key));
    Ok(())
}

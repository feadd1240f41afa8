//! Purge, clear and stats commands - whole-snapshot maintenance

use crate::cache::CacheBackend;
use crate::cli::args::ClearArgs;
use crate::cli::commands::open_snapshot;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};
use std::path::Path;

/// Drop expired entries and rewrite the snapshot
pub fn purge(config: &Config, snapshot: &Path) -> CacheResult<()> {
    let backend = open_snapshot(snapshot, config)?;
    let removed = backend.purge_expired()?;

    let ctx = UiContext::detect();
    ui::step_ok_detail(
        &ctx,
        &format!("Purged {} expired entr{}", removed, if removed == 1 { "y" } else { "ies" }),
        &snapshot.display().to_string(),
    );
    Ok(())
}

/// Remove every entry after confirmation
pub fn clear(args: ClearArgs, config: &Config, snapshot: &Path) -> CacheResult<()> {
    let backend = open_snapshot(snapshot, config)?;
    let ctx = UiContext::detect().with_auto_yes(args.yes);

    if backend.is_empty() {
        ui::step_info(&ctx, "Snapshot is already empty");
        return Ok(());
    }

    let question = format!("Remove {} entries from {}?", backend.len(), snapshot.display());
    if !ui::confirm(&ctx, &question) {
        ui::step_warn_hint(&ctx, "Aborted", "Use --yes to skip confirmation");
        return Ok(());
    }

    backend.clear()?;
    ui::step_ok(&ctx, "Snapshot cleared");
    Ok(())
}

/// Show entry counts and the age range of the snapshot
pub fn stats(config: &Config, snapshot: &Path) -> CacheResult<()> {
    let backend = open_snapshot(snapshot, config)?;
    let entries = backend.entries();
    let expired = entries.iter().filter(|e| e.expired).count();
    let ctx = UiContext::detect();

    ui::intro(&ctx, "Cache Snapshot");
    ui::key_value(&ctx, "Path", &snapshot.display().to_string());
    ui::key_value(&ctx, "Entries", &entries.len().to_string());
    ui::key_value(&ctx, "Live", &(entries.len() - expired).to_string());
    ui::key_value(&ctx, "Expired", &expired.to_string());
    ui::key_value(&ctx, "Capacity", &backend.config().capacity().to_string());
    ui::key_value(
        &ctx,
        "TTL",
        &format!("{}s", backend.config().ttl().num_seconds()),
    );

    if let (Some(oldest), Some(newest)) = (
        entries.iter().map(|e| e.inserted_at).min(),
        entries.iter().map(|e| e.inserted_at).max(),
    ) {
        ui::key_value(&ctx, "Oldest", &oldest.to_rfc3339());
        ui::key_value(&ctx, "Newest", &newest.to_rfc3339());
    }

    Ok(())
}

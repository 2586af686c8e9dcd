//! Human-readable dump of the newest stored rows.

use anyhow::{Context, Result};
use mempool_store::{SnapshotRow, SnapshotStore};
use mempool_watch_types::ReplacementEdge;
use std::fmt::Display;
use std::io::Write;

fn opt<T: Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

pub fn format_snapshot_row(row: &SnapshotRow) -> String {
    format!(
        "{} {} success={} latency_ms={} data_len={}",
        row.observed_at,
        row.endpoint,
        u8::from(row.success),
        opt(&row.latency_ms),
        row.data_len
    )
}

pub fn format_replacement_row(edge: &ReplacementEdge) -> String {
    format!(
        "{} event_time={} {} -> {} old_fee_sat={} new_fee_sat={}",
        edge.observed_at,
        opt(&edge.event_time),
        edge.old_txid,
        edge.new_txid,
        opt(&edge.old_fee_sat),
        opt(&edge.new_fee_sat)
    )
}

/// Write the newest `limit` snapshots and replacement events to `out`.
pub fn write_latest<W: Write>(store: &mut dyn SnapshotStore, limit: usize, out: &mut W) -> Result<()> {
    let snapshots = store
        .latest_snapshots(limit)
        .context("Failed to read api_snapshots")?;
    let events = store
        .latest_replacement_events(limit)
        .context("Failed to read replacement_events")?;

    writeln!(out, "api_snapshots (latest)")?;
    for row in &snapshots {
        writeln!(out, "{}", format_snapshot_row(row))?;
    }

    writeln!(out)?;
    writeln!(out, "replacement_events (latest)")?;
    if events.is_empty() {
        writeln!(out, "(none)")?;
    }
    for edge in &events {
        writeln!(out, "{}", format_replacement_row(edge))?;
    }
    Ok(())
}

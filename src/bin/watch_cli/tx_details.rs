//! `tx-details`: backfill per-transaction details for replacement txids.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use clap::{Args, ValueEnum};
use mempool_store::{open_store, TxidSelection};
use mempool_transport::ThreadSleeper;
use mempool_watch::{JsonlSink, TxDetailBackfill, TxDetailOptions};
use mempool_watch_types::duration_from_secs;
use std::path::PathBuf;

use super::network::NetworkArgs;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DetailMode {
    /// Only txids without a successful stored detail
    Pending,
    /// Every txid, refetching stored ones
    All,
}

impl DetailMode {
    fn selection(self) -> TxidSelection {
        match self {
            Self::Pending => TxidSelection::Pending,
            Self::All => TxidSelection::All,
        }
    }
}

#[derive(Args, Debug)]
pub struct TxDetailsCmd {
    #[command(flatten)]
    net: NetworkArgs,

    /// Database holding replacement_events (path or URL)
    #[arg(long, env = "MEMPOOL_WATCH_DB", default_value = "./data/mempool.db")]
    db: String,

    /// Directory for tx_details.jsonl
    #[arg(long, env = "MEMPOOL_WATCH_OUTDIR", default_value = "./data", value_name = "DIR")]
    outdir: PathBuf,

    /// Seconds to pause between requests
    #[arg(long, default_value_t = 0.2, value_name = "SECS")]
    sleep: f64,

    /// Maximum txids to fetch (0 = all)
    #[arg(long, default_value_t = 0)]
    limit: u64,

    /// Only txids from replacement events observed at or after this ISO time
    #[arg(long)]
    since: Option<String>,

    /// Which txids to fetch
    #[arg(long, value_enum)]
    mode: DetailMode,

    /// Do not write tx_details.jsonl
    #[arg(long, default_value_t = false)]
    no_jsonl: bool,
}

/// Accept RFC 3339 timestamps, offset-less ISO timestamps or plain dates;
/// the value is compared as text.
fn validate_since(since: &str) -> Result<()> {
    if DateTime::parse_from_rfc3339(since).is_ok()
        || NaiveDateTime::parse_from_str(since, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(since, "%Y-%m-%d").is_ok()
    {
        return Ok(());
    }
    Err(anyhow!(
        "--since must be an ISO-8601 date or timestamp, got '{}'",
        since
    ))
}

impl TxDetailsCmd {
    fn options(&self) -> Result<TxDetailOptions> {
        let since = self.since.as_deref().filter(|s| !s.is_empty());
        if let Some(since) = since {
            validate_since(since)?;
        }
        Ok(TxDetailOptions {
            mode: self.mode.selection(),
            since: since.map(str::to_string),
            limit: (self.limit > 0).then_some(self.limit),
            pause: duration_from_secs(self.sleep).context("--sleep must be finite seconds")?,
        })
    }

    pub fn execute(&self) -> Result<()> {
        let options = self.options()?;
        let store =
            open_store(&self.db).with_context(|| format!("Failed to open store {}", self.db))?;
        let client = self.net.client()?;
        let sink = (!self.no_jsonl).then(|| JsonlSink::new(&self.outdir));

        let mut backfill = TxDetailBackfill::new(client, ThreadSleeper, store, sink, options);
        let report = backfill.run()?;
        println!("ok={} failed={}", report.ok, report.failed);
        Ok(())
    }
}

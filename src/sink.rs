//! Append-only JSONL files, one per endpoint.

use anyhow::{Context, Result};
use mempool_watch_types::{to_ascii_json, Endpoint};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the transaction-detail backfill log.
pub const TX_DETAILS_FILE: &str = "tx_details.jsonl";

#[derive(Serialize)]
struct SnapshotLine<'a> {
    observed_at: &'a str,
    data: &'a Value,
}

#[derive(Serialize)]
struct TxDetailLine<'a> {
    fetched_at: &'a str,
    txid: &'a str,
    data: &'a Value,
}

/// Writes newline-terminated, ASCII-escaped JSON records under `outdir`.
///
/// Files are opened in append mode per record, so a crash never leaves a
/// half-buffered line behind.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    outdir: PathBuf,
}

impl JsonlSink {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
        }
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Path of the JSONL file for `endpoint`.
    pub fn endpoint_path(&self, endpoint: Endpoint) -> PathBuf {
        self.outdir.join(endpoint.jsonl_file_name())
    }

    /// Append `{"observed_at": .., "data": ..}` to `<outdir>/<endpoint>.jsonl`.
    pub fn append_snapshot(&self, endpoint: Endpoint, observed_at: &str, data: &Value) -> Result<()> {
        let line = SnapshotLine { observed_at, data };
        self.append(&self.endpoint_path(endpoint), &line)
    }

    /// Append `{"fetched_at": .., "txid": .., "data": ..}` to `tx_details.jsonl`.
    pub fn append_tx_detail(&self, fetched_at: &str, txid: &str, data: &Value) -> Result<()> {
        let line = TxDetailLine {
            fetched_at,
            txid,
            data,
        };
        self.append(&self.outdir.join(TX_DETAILS_FILE), &line)
    }

    fn append<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        fs::create_dir_all(&self.outdir)
            .with_context(|| format!("Failed to create {}", self.outdir.display()))?;

        let mut line = to_ascii_json(record).context("Failed to encode JSONL record")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to {}", path.display()))?;
        Ok(())
    }
}

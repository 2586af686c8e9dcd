//! Transaction-detail backfill for txids seen in `replacement_events`.

use anyhow::{Context, Result};
use mempool_store::{SnapshotStore, TxidQuery, TxidSelection};
use mempool_transport::{Fetch, FetchError, Sleeper};
use mempool_watch_types::{tx_detail_path, utc_now_iso, TransactionDetail};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::sink::JsonlSink;

#[derive(Debug, Clone, PartialEq)]
pub struct TxDetailOptions {
    pub mode: TxidSelection,
    /// Only consider replacement events observed at or after this ISO time.
    pub since: Option<String>,
    pub limit: Option<u64>,
    /// Pause between two detail requests.
    pub pause: Duration,
}

impl TxDetailOptions {
    pub fn new(mode: TxidSelection) -> Self {
        Self {
            mode,
            since: None,
            limit: None,
            pause: Duration::ZERO,
        }
    }

    fn query(&self) -> TxidQuery {
        TxidQuery {
            selection: self.mode,
            since: self.since.clone(),
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub ok: usize,
    pub failed: usize,
    pub storage_errors: usize,
}

/// Fetches `/api/tx/{txid}` once per candidate txid and upserts the result.
pub struct TxDetailBackfill<F, S> {
    client: F,
    sleeper: S,
    store: Box<dyn SnapshotStore>,
    sink: Option<JsonlSink>,
    options: TxDetailOptions,
}

impl<F: Fetch, S: Sleeper> TxDetailBackfill<F, S> {
    pub fn new(
        client: F,
        sleeper: S,
        store: Box<dyn SnapshotStore>,
        sink: Option<JsonlSink>,
        options: TxDetailOptions,
    ) -> Self {
        Self {
            client,
            sleeper,
            store,
            sink,
            options,
        }
    }

    pub fn store_mut(&mut self) -> &mut dyn SnapshotStore {
        self.store.as_mut()
    }

    /// Candidate txids in fetch order.
    pub fn candidates(&mut self) -> Result<Vec<String>> {
        self.store
            .replacement_txids(&self.options.query())
            .context("Failed to query replacement txids")
    }

    pub fn run(&mut self) -> Result<BackfillReport> {
        let txids = self.candidates()?;
        info!(count = txids.len(), mode = ?self.options.mode, "fetching tx details");

        let mut report = BackfillReport::default();
        for (i, txid) in txids.iter().enumerate() {
            if i > 0 && !self.options.pause.is_zero() {
                self.sleeper.sleep(self.options.pause);
            }
            self.fetch_one(txid, &mut report);
        }

        info!(ok = report.ok, failed = report.failed, "tx detail backfill done");
        Ok(report)
    }

    fn fetch_one(&mut self, txid: &str, report: &mut BackfillReport) {
        let fetched_at = utc_now_iso();
        let detail = match self.client.fetch(&tx_detail_path(txid)) {
            Ok(fetched) => {
                report.ok += 1;
                if let Some(sink) = &self.sink {
                    if let Err(e) = sink.append_tx_detail(&fetched_at, txid, &fetched.value) {
                        error!(txid, error = %format!("{:#}", e), "JSONL append failed");
                    }
                }
                info!(txid, latency_ms = fetched.latency_ms, "ok");
                TransactionDetail::fetched(txid, &fetched_at, fetched.value)
            }
            Err(FetchError::Status { code, body }) => {
                report.failed += 1;
                warn!(txid, status = code, "tx detail request rejected");
                TransactionDetail::failed(txid, &fetched_at, Some(code), &body)
            }
            Err(err) => {
                report.failed += 1;
                warn!(txid, error = %err, "tx detail request failed");
                TransactionDetail::failed(txid, &fetched_at, None, &err.to_string())
            }
        };

        if let Err(e) = self.store.upsert_tx_detail(&detail) {
            error!(txid, error = %e, "tx detail write failed");
            report.storage_errors += 1;
        }
    }
}

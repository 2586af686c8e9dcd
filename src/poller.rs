//! Poll orchestration: fetch every enabled endpoint once per cycle and hand
//! each outcome to the JSONL sink and the store.

use mempool_store::SnapshotStore;
use mempool_transport::{Fetch, RetryingFetcher, Sleeper};
use mempool_watch_types::{utc_now_iso, Endpoint, ReplacementEdge, Snapshot};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::flatten::edges_from_payload;
use crate::metrics::RunMetrics;
use crate::sink::JsonlSink;

/// Which endpoints are polled. All are enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointToggles {
    pub mempool: bool,
    pub fees: bool,
    pub fees_precise: bool,
    pub mempool_blocks: bool,
    pub replacements: bool,
}

impl Default for EndpointToggles {
    fn default() -> Self {
        Self {
            mempool: true,
            fees: true,
            fees_precise: true,
            mempool_blocks: true,
            replacements: true,
        }
    }
}

impl EndpointToggles {
    pub fn is_enabled(&self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Mempool => self.mempool,
            Endpoint::Fees => self.fees,
            Endpoint::FeesPrecise => self.fees_precise,
            Endpoint::MempoolBlocks => self.mempool_blocks,
            Endpoint::Replacements => self.replacements,
        }
    }

    pub fn set(&mut self, endpoint: Endpoint, enabled: bool) {
        let slot = match endpoint {
            Endpoint::Mempool => &mut self.mempool,
            Endpoint::Fees => &mut self.fees,
            Endpoint::FeesPrecise => &mut self.fees_precise,
            Endpoint::MempoolBlocks => &mut self.mempool_blocks,
            Endpoint::Replacements => &mut self.replacements,
        };
        *slot = enabled;
    }

    /// Enabled endpoints in poll order.
    pub fn enabled(&self) -> Vec<Endpoint> {
        Endpoint::ALL
            .into_iter()
            .filter(|e| self.is_enabled(*e))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PollConfig {
    /// Pause after each cycle. Zero runs a single cycle.
    pub interval: Duration,
    pub endpoints: EndpointToggles,
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Timestamp shared by every record of the cycle.
    pub observed_at: String,
    pub fetched_ok: usize,
    pub fetched_err: usize,
    pub snapshots_written: usize,
    pub edges_written: usize,
    /// Store writes that failed and were skipped.
    pub storage_errors: usize,
    /// JSONL appends that failed and were skipped.
    pub sink_errors: usize,
}

/// Drives the poll loop. Idle between cycles, cycling otherwise.
pub struct Poller<F, S> {
    fetcher: RetryingFetcher<F, S>,
    store: Box<dyn SnapshotStore>,
    sink: Option<JsonlSink>,
    metrics: RunMetrics,
    config: PollConfig,
}

impl<F: Fetch, S: Sleeper> Poller<F, S> {
    pub fn new(
        fetcher: RetryingFetcher<F, S>,
        store: Box<dyn SnapshotStore>,
        sink: Option<JsonlSink>,
        config: PollConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            sink,
            metrics: RunMetrics::new(),
            config,
        }
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn store_mut(&mut self) -> &mut dyn SnapshotStore {
        self.store.as_mut()
    }

    /// Run until stopped: one cycle when the interval is zero, otherwise
    /// forever with `interval` between the end of one cycle and the start of
    /// the next.
    pub fn run(&mut self) {
        loop {
            self.run_cycle();
            if self.config.interval.is_zero() {
                return;
            }
            self.fetcher.sleeper().sleep(self.config.interval);
        }
    }

    /// Run at most `cycles` cycles, pausing `interval` between them.
    pub fn run_cycles(&mut self, cycles: usize) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(cycles);
        for n in 0..cycles {
            if n > 0 && !self.config.interval.is_zero() {
                self.fetcher.sleeper().sleep(self.config.interval);
            }
            reports.push(self.run_cycle());
        }
        reports
    }

    /// Fetch every enabled endpoint once, in poll order.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport {
            observed_at: utc_now_iso(),
            ..Default::default()
        };

        for endpoint in self.config.endpoints.enabled() {
            self.poll_endpoint(endpoint, &mut report);
        }

        info!(observed_at = %report.observed_at, "{}", self.metrics);
        report
    }

    fn poll_endpoint(&mut self, endpoint: Endpoint, report: &mut CycleReport) {
        let observed_at = report.observed_at.clone();
        match self.fetcher.fetch_with_retry(endpoint.path()) {
            Ok(fetched) => {
                self.metrics.record_success(fetched.latency_ms);
                report.fetched_ok += 1;
                debug!(
                    endpoint = %endpoint,
                    latency_ms = fetched.latency_ms,
                    retries = fetched.retries_used,
                    "fetched"
                );

                if let Some(sink) = &self.sink {
                    if let Err(e) = sink.append_snapshot(endpoint, &observed_at, &fetched.value) {
                        error!(endpoint = %endpoint, error = %format!("{:#}", e), "JSONL append failed");
                        report.sink_errors += 1;
                    }
                }

                let edges = if endpoint == Endpoint::Replacements {
                    edges_from_payload(&observed_at, &fetched.value)
                } else {
                    Vec::new()
                };

                let snapshot =
                    Snapshot::success(&observed_at, endpoint, fetched.latency_ms, fetched.value);
                self.persist_snapshot(&snapshot, report);
                self.persist_edges(&edges, report);
            }
            Err(err) => {
                self.metrics.record_failure();
                report.fetched_err += 1;
                warn!(endpoint = %endpoint, error = %err, "fetch failed after retries");

                let snapshot = Snapshot::failure(&observed_at, endpoint, err.to_string());
                self.persist_snapshot(&snapshot, report);
            }
        }
    }

    fn persist_snapshot(&mut self, snapshot: &Snapshot, report: &mut CycleReport) {
        match self.store.write_snapshot(snapshot) {
            Ok(()) => report.snapshots_written += 1,
            Err(e) => {
                error!(endpoint = %snapshot.endpoint, error = %e, "snapshot write failed");
                report.storage_errors += 1;
            }
        }
    }

    fn persist_edges(&mut self, edges: &[ReplacementEdge], report: &mut CycleReport) {
        for edge in edges {
            match self.store.write_replacement_edge(edge) {
                Ok(()) => report.edges_written += 1,
                Err(e) => {
                    error!(
                        old_txid = %edge.old_txid,
                        new_txid = %edge.new_txid,
                        error = %e,
                        "replacement event write failed"
                    );
                    report.storage_errors += 1;
                }
            }
        }
    }
}

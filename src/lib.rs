//! mempool-watch
//!
//! Polls a mempool.space-compatible API, records every fetch outcome and
//! derives replace-by-fee events from the replacements feed:
//!
//! - **Polling**: [`poller::Poller`] fetches each enabled endpoint once per
//!   cycle with bounded retry, writes JSONL and store rows, tracks metrics
//! - **Flattening**: [`flatten`] turns nested replacement trees into
//!   old -> new edges
//! - **Backfill**: [`tx_details::TxDetailBackfill`] fetches per-transaction
//!   details for txids seen in replacement events
//! - **Inspection**: [`inspect::write_latest`] prints the newest stored rows
//!
//! Transport lives in `mempool-transport`, storage in `mempool-store`.

pub mod flatten;
pub mod inspect;
pub mod metrics;
pub mod poller;
pub mod sink;
pub mod tx_details;

pub use flatten::{edges_from_payload, flatten, FlatEdge, ReplacementNode, TxSummary};
pub use metrics::RunMetrics;
pub use poller::{CycleReport, EndpointToggles, PollConfig, Poller};
pub use sink::JsonlSink;
pub use tx_details::{BackfillReport, TxDetailBackfill, TxDetailOptions};

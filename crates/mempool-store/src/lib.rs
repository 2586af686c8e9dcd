//! Relational persistence for mempool observations.
//!
//! This crate provides:
//! - [`SnapshotStore`]: the uniform write/query interface every backend implements
//! - [`SqliteStore`]: embedded file-backed backend (WAL journaling)
//! - [`PostgresStore`]: networked backend
//! - [`open_store`]: backend selection by connection-string scheme
//!
//! Three tables are managed: `api_snapshots` and `replacement_events` are
//! append-only, `tx_details` is upserted by `txid`. Every write commits on
//! its own; there are no multi-row transactions.

pub mod error;
pub mod pg;
pub mod sqlite;
pub mod url;

pub use pg::PostgresStore;
pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use url::StoreUrl;

use mempool_watch_types::{ReplacementEdge, Snapshot, TransactionDetail};
use tracing::info;

/// Which backend a store is running on (informational only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Postgres,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Sqlite => "sqlite",
            StoreKind::Postgres => "postgres",
        }
    }
}

/// Which replacement txids are candidates for a detail fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxidSelection {
    /// Only txids without a successful `tx_details` row.
    Pending,
    /// Every distinct txid, even when already stored.
    All,
}

/// Query for distinct txids appearing in `replacement_events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxidQuery {
    pub selection: TxidSelection,
    /// Only consider events with `observed_at >= since`.
    pub since: Option<String>,
    /// Maximum number of txids returned.
    pub limit: Option<u64>,
}

impl TxidQuery {
    pub fn new(selection: TxidSelection) -> Self {
        Self {
            selection,
            since: None,
            limit: None,
        }
    }
}

/// Summary of one `api_snapshots` row.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub observed_at: String,
    pub endpoint: String,
    pub success: bool,
    pub latency_ms: Option<i64>,
    pub error: Option<String>,
    /// Length of the stored `data_json` text (0 when absent).
    pub data_len: usize,
}

/// Uniform storage interface; callers never branch on backend kind.
pub trait SnapshotStore {
    fn kind(&self) -> StoreKind;

    /// Create tables and indexes if absent. Safe to call repeatedly.
    fn ensure_schema(&mut self) -> Result<(), StoreError>;

    /// Append one snapshot row.
    fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Append one replacement event row.
    fn write_replacement_edge(&mut self, edge: &ReplacementEdge) -> Result<(), StoreError>;

    /// Insert or replace the detail row keyed by `detail.txid`.
    fn upsert_tx_detail(&mut self, detail: &TransactionDetail) -> Result<(), StoreError>;

    /// Distinct old/new txids from `replacement_events`, ordered by txid.
    fn replacement_txids(&mut self, query: &TxidQuery) -> Result<Vec<String>, StoreError>;

    /// Newest snapshot rows first.
    fn latest_snapshots(&mut self, limit: usize) -> Result<Vec<SnapshotRow>, StoreError>;

    /// Newest replacement events first.
    fn latest_replacement_events(&mut self, limit: usize)
        -> Result<Vec<ReplacementEdge>, StoreError>;

    /// Stored detail for a txid, if any.
    fn tx_detail(&mut self, txid: &str) -> Result<Option<TransactionDetail>, StoreError>;
}

/// Open the backend named by `url` and make sure its schema exists.
///
/// Unsupported schemes fail here, before any fetch happens.
pub fn open_store(url: &str) -> Result<Box<dyn SnapshotStore>, StoreError> {
    let mut store: Box<dyn SnapshotStore> = match StoreUrl::parse(url)? {
        StoreUrl::Sqlite(path) => Box::new(SqliteStore::open(&path)?),
        StoreUrl::Postgres(conn) => Box::new(PostgresStore::connect(&conn)?),
    };
    store.ensure_schema()?;
    info!(backend = store.kind().as_str(), "storage ready");
    Ok(store)
}

fn encode_payload(payload: Option<&serde_json::Value>) -> Result<Option<String>, StoreError> {
    payload
        .map(mempool_watch_types::to_ascii_json)
        .transpose()
        .map_err(StoreError::from)
}

fn decode_payload(data_json: Option<String>) -> Result<Option<serde_json::Value>, StoreError> {
    data_json
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_rejects_unknown_scheme_before_connecting() {
        let err = open_store("redis://localhost:6379").err().expect("must fail");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_open_store_sqlite_creates_schema() -> Result<(), StoreError> {
        let temp_dir = TempDir::new().map_err(|e| StoreError::Io {
            path: "tmp".into(),
            source: e,
        })?;
        let path = temp_dir.path().join("nested").join("mempool.db");
        let url = format!("sqlite://{}", path.display());

        let mut store = open_store(&url)?;
        assert_eq!(store.kind(), StoreKind::Sqlite);
        assert!(store.latest_snapshots(5)?.is_empty());
        assert!(path.exists());
        Ok(())
    }
}

//! Embedded SQLite backend.

use mempool_watch_types::{ReplacementEdge, Snapshot, TransactionDetail};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;
use crate::{
    decode_payload, encode_payload, SnapshotRow, SnapshotStore, StoreKind, TxidQuery,
    TxidSelection,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS api_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    observed_at TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    success INTEGER NOT NULL,
    latency_ms INTEGER,
    error TEXT,
    data_json TEXT
);
CREATE TABLE IF NOT EXISTS replacement_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    observed_at TEXT NOT NULL,
    event_time INTEGER,
    old_txid TEXT NOT NULL,
    new_txid TEXT NOT NULL,
    old_fee_sat REAL,
    old_feerate REAL,
    old_vsize REAL,
    new_fee_sat REAL,
    new_feerate REAL,
    new_vsize REAL,
    interval_seconds INTEGER,
    full_rbf INTEGER,
    mined INTEGER
);
CREATE TABLE IF NOT EXISTS tx_details (
    txid TEXT PRIMARY KEY,
    fetched_at TEXT NOT NULL,
    success INTEGER NOT NULL,
    status_code INTEGER,
    error TEXT,
    data_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_api_snapshots_time ON api_snapshots(observed_at);
CREATE INDEX IF NOT EXISTS idx_api_snapshots_endpoint ON api_snapshots(endpoint);
CREATE INDEX IF NOT EXISTS idx_replacement_events_time ON replacement_events(observed_at);
CREATE INDEX IF NOT EXISTS idx_replacement_events_txids ON replacement_events(old_txid, new_txid);
CREATE INDEX IF NOT EXISTS idx_tx_details_fetched_at ON tx_details(fetched_at);
"#;

const EDGE_COLUMNS: &str = "observed_at, event_time, old_txid, new_txid, old_fee_sat, \
     old_feerate, old_vsize, new_fee_sat, new_feerate, new_vsize, interval_seconds, full_rbf, mined";

/// SQLite-backed [`SnapshotStore`].
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file and switch it to WAL journaling.
    ///
    /// The parent directory is created when missing.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened sqlite store");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying connection, for ad-hoc read queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<ReplacementEdge> {
    Ok(ReplacementEdge {
        observed_at: row.get(0)?,
        event_time: row.get(1)?,
        old_txid: row.get(2)?,
        new_txid: row.get(3)?,
        old_fee_sat: row.get(4)?,
        old_feerate: row.get(5)?,
        old_vsize: row.get(6)?,
        new_fee_sat: row.get(7)?,
        new_feerate: row.get(8)?,
        new_vsize: row.get(9)?,
        interval_seconds: row.get(10)?,
        full_rbf: row.get::<_, Option<i64>>(11)?.map(|v| v != 0),
        mined: row.get::<_, Option<i64>>(12)?.map(|v| v != 0),
    })
}

impl SnapshotStore for SqliteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }

    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data_json = encode_payload(snapshot.payload())?;
        self.conn.execute(
            "INSERT INTO api_snapshots (observed_at, endpoint, success, latency_ms, error, data_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.observed_at,
                snapshot.endpoint.name(),
                bool_to_int(snapshot.is_success()),
                snapshot.latency_ms().map(|ms| ms as i64),
                snapshot.error(),
                data_json,
            ],
        )?;
        Ok(())
    }

    fn write_replacement_edge(&mut self, edge: &ReplacementEdge) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO replacement_events ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            EDGE_COLUMNS
        );
        self.conn.execute(
            &sql,
            params![
                edge.observed_at,
                edge.event_time,
                edge.old_txid,
                edge.new_txid,
                edge.old_fee_sat,
                edge.old_feerate,
                edge.old_vsize,
                edge.new_fee_sat,
                edge.new_feerate,
                edge.new_vsize,
                edge.interval_seconds,
                edge.full_rbf.map(bool_to_int),
                edge.mined.map(bool_to_int),
            ],
        )?;
        Ok(())
    }

    fn upsert_tx_detail(&mut self, detail: &TransactionDetail) -> Result<(), StoreError> {
        let data_json = encode_payload(detail.payload.as_ref())?;
        self.conn.execute(
            "INSERT OR REPLACE INTO tx_details (txid, fetched_at, success, status_code, error, data_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                detail.txid,
                detail.fetched_at,
                bool_to_int(detail.success),
                detail.status_code.map(i64::from),
                detail.error,
                data_json,
            ],
        )?;
        Ok(())
    }

    fn replacement_txids(&mut self, query: &TxidQuery) -> Result<Vec<String>, StoreError> {
        let since_clause = if query.since.is_some() {
            " WHERE observed_at >= ?1"
        } else {
            ""
        };
        let mut sql = format!(
            "SELECT t.txid FROM (\
             SELECT old_txid AS txid FROM replacement_events{since} \
             UNION SELECT new_txid AS txid FROM replacement_events{since}\
             ) t",
            since = since_clause
        );
        match query.selection {
            TxidSelection::All => sql.push_str(" WHERE t.txid IS NOT NULL"),
            TxidSelection::Pending => sql.push_str(
                " LEFT JOIN tx_details d ON t.txid = d.txid AND d.success = 1 \
                 WHERE t.txid IS NOT NULL AND d.txid IS NULL",
            ),
        }
        sql.push_str(" ORDER BY t.txid");
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(query.since.iter()), |row| row.get(0))?;
        let txids = rows.collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(txids)
    }

    fn latest_snapshots(&mut self, limit: usize) -> Result<Vec<SnapshotRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT observed_at, endpoint, success, latency_ms, error, data_json \
             FROM api_snapshots ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let data_json: Option<String> = row.get(5)?;
            Ok(SnapshotRow {
                observed_at: row.get(0)?,
                endpoint: row.get(1)?,
                success: row.get::<_, i64>(2)? != 0,
                latency_ms: row.get(3)?,
                error: row.get(4)?,
                data_len: data_json.map(|d| d.len()).unwrap_or(0),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn latest_replacement_events(
        &mut self,
        limit: usize,
    ) -> Result<Vec<ReplacementEdge>, StoreError> {
        let sql = format!(
            "SELECT {} FROM replacement_events ORDER BY id DESC LIMIT ?1",
            EDGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], edge_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn tx_detail(&mut self, txid: &str) -> Result<Option<TransactionDetail>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT txid, fetched_at, success, status_code, error, data_json \
                 FROM tx_details WHERE txid = ?1",
                params![txid],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((txid, fetched_at, success, status_code, error, data_json)) = row else {
            return Ok(None);
        };
        Ok(Some(TransactionDetail {
            txid,
            fetched_at,
            success: success != 0,
            status_code: status_code.and_then(|c| u16::try_from(c).ok()),
            error,
            payload: decode_payload(data_json)?,
        }))
    }
}

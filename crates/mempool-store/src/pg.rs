//! Networked PostgreSQL backend.

use mempool_watch_types::{ReplacementEdge, Snapshot, TransactionDetail};
use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use tracing::debug;

use crate::error::StoreError;
use crate::{
    decode_payload, encode_payload, SnapshotRow, SnapshotStore, StoreKind, TxidQuery,
    TxidSelection,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS api_snapshots (
    id SERIAL PRIMARY KEY,
    observed_at TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    success INTEGER NOT NULL,
    latency_ms INTEGER,
    error TEXT,
    data_json TEXT
);
CREATE TABLE IF NOT EXISTS replacement_events (
    id SERIAL PRIMARY KEY,
    observed_at TEXT NOT NULL,
    event_time BIGINT,
    old_txid TEXT NOT NULL,
    new_txid TEXT NOT NULL,
    old_fee_sat DOUBLE PRECISION,
    old_feerate DOUBLE PRECISION,
    old_vsize DOUBLE PRECISION,
    new_fee_sat DOUBLE PRECISION,
    new_feerate DOUBLE PRECISION,
    new_vsize DOUBLE PRECISION,
    interval_seconds BIGINT,
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

/// PostgreSQL-backed [`SnapshotStore`].
///
/// Uses a plain (non-TLS) connection; each statement autocommits.
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::connect(url, NoTls)?;
        debug!("connected to postgres");
        Ok(Self { client })
    }
}

fn bool_to_int(value: bool) -> i32 {
    i32::from(value)
}

fn clamp_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn edge_from_row(row: &Row) -> Result<ReplacementEdge, postgres::Error> {
    Ok(ReplacementEdge {
        observed_at: row.try_get(0)?,
        event_time: row.try_get(1)?,
        old_txid: row.try_get(2)?,
        new_txid: row.try_get(3)?,
        old_fee_sat: row.try_get(4)?,
        old_feerate: row.try_get(5)?,
        old_vsize: row.try_get(6)?,
        new_fee_sat: row.try_get(7)?,
        new_feerate: row.try_get(8)?,
        new_vsize: row.try_get(9)?,
        interval_seconds: row.try_get(10)?,
        full_rbf: row.try_get::<_, Option<i32>>(11)?.map(|v| v != 0),
        mined: row.try_get::<_, Option<i32>>(12)?.map(|v| v != 0),
    })
}

impl SnapshotStore for PostgresStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute(SCHEMA)?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data_json = encode_payload(snapshot.payload())?;
        self.client.execute(
            "INSERT INTO api_snapshots (observed_at, endpoint, success, latency_ms, error, data_json) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &snapshot.observed_at,
                &snapshot.endpoint.name(),
                &bool_to_int(snapshot.is_success()),
                &snapshot.latency_ms().map(clamp_i32),
                &snapshot.error(),
                &data_json,
            ],
        )?;
        Ok(())
    }

    fn write_replacement_edge(&mut self, edge: &ReplacementEdge) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO replacement_events ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            EDGE_COLUMNS
        );
        self.client.execute(
            sql.as_str(),
            &[
                &edge.observed_at,
                &edge.event_time,
                &edge.old_txid,
                &edge.new_txid,
                &edge.old_fee_sat,
                &edge.old_feerate,
                &edge.old_vsize,
                &edge.new_fee_sat,
                &edge.new_feerate,
                &edge.new_vsize,
                &edge.interval_seconds,
                &edge.full_rbf.map(bool_to_int),
                &edge.mined.map(bool_to_int),
            ],
        )?;
        Ok(())
    }

    fn upsert_tx_detail(&mut self, detail: &TransactionDetail) -> Result<(), StoreError> {
        let data_json = encode_payload(detail.payload.as_ref())?;
        self.client.execute(
            "INSERT INTO tx_details (txid, fetched_at, success, status_code, error, data_json) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (txid) DO UPDATE SET \
               fetched_at = EXCLUDED.fetched_at, \
               success = EXCLUDED.success, \
               status_code = EXCLUDED.status_code, \
               error = EXCLUDED.error, \
               data_json = EXCLUDED.data_json",
            &[
                &detail.txid,
                &detail.fetched_at,
                &bool_to_int(detail.success),
                &detail.status_code.map(i32::from),
                &detail.error,
                &data_json,
            ],
        )?;
        Ok(())
    }

    fn replacement_txids(&mut self, query: &TxidQuery) -> Result<Vec<String>, StoreError> {
        let since_clause = if query.since.is_some() {
            " WHERE observed_at >= $1"
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

        let params: Vec<&(dyn ToSql + Sync)> = match &query.since {
            Some(since) => vec![since as &(dyn ToSql + Sync)],
            None => Vec::new(),
        };
        let rows = self.client.query(sql.as_str(), &params)?;
        let txids = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(txids)
    }

    fn latest_snapshots(&mut self, limit: usize) -> Result<Vec<SnapshotRow>, StoreError> {
        let rows = self.client.query(
            "SELECT observed_at, endpoint, success, latency_ms, error, data_json \
             FROM api_snapshots ORDER BY id DESC LIMIT $1",
            &[&(limit as i64)],
        )?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let data_json: Option<String> = row.try_get(5)?;
            out.push(SnapshotRow {
                observed_at: row.try_get(0)?,
                endpoint: row.try_get(1)?,
                success: row.try_get::<_, i32>(2)? != 0,
                latency_ms: row.try_get::<_, Option<i32>>(3)?.map(i64::from),
                error: row.try_get(4)?,
                data_len: data_json.map(|d| d.len()).unwrap_or(0),
            });
        }
        Ok(out)
    }

    fn latest_replacement_events(
        &mut self,
        limit: usize,
    ) -> Result<Vec<ReplacementEdge>, StoreError> {
        let sql = format!(
            "SELECT {} FROM replacement_events ORDER BY id DESC LIMIT $1",
            EDGE_COLUMNS
        );
        let rows = self.client.query(sql.as_str(), &[&(limit as i64)])?;
        let edges = rows
            .iter()
            .map(edge_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    fn tx_detail(&mut self, txid: &str) -> Result<Option<TransactionDetail>, StoreError> {
        let row = self.client.query_opt(
            "SELECT txid, fetched_at, success, status_code, error, data_json \
             FROM tx_details WHERE txid = $1",
            &[&txid],
        )?;
        let Some(row) = row else {
            return Ok(None);
        };
        let status_code: Option<i32> = row.try_get(3)?;
        Ok(Some(TransactionDetail {
            txid: row.try_get(0)?,
            fetched_at: row.try_get(1)?,
            success: row.try_get::<_, i32>(2)? != 0,
            status_code: status_code.and_then(|c| u16::try_from(c).ok()),
            error: row.try_get(4)?,
            payload: decode_payload(row.try_get(5)?)?,
        }))
    }
}

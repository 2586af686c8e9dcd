//! End-to-end: real HTTP client against a local mock API, SQLite store,
//! JSONL sink.

mod common;

use common::{healthy_routes, sqlite_count, MockApi};
use mempool_store::{open_store, SnapshotStore, TxidSelection};
use mempool_transport::{HttpClient, RetryingFetcher, TlsMode};
use mempool_transport::test_utils::RecordingSleeper;
use mempool_watch::{JsonlSink, PollConfig, Poller, TxDetailBackfill, TxDetailOptions};
use mempool_watch_types::RetryConfig;
use std::time::Duration;
use tempfile::TempDir;

fn client(api: &MockApi) -> HttpClient {
    HttpClient::new(api.base_url(), Duration::from_secs(5), TlsMode::Verify).unwrap()
}

#[test]
fn test_single_cycle_records_every_endpoint() {
    let api = MockApi::start(healthy_routes());
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("mempool.db");

    let store = open_store(db.to_str().unwrap()).unwrap();
    let fetcher = RetryingFetcher::new(client(&api), RecordingSleeper::new(), RetryConfig::default());
    let mut poller = Poller::new(
        fetcher,
        store,
        Some(JsonlSink::new(temp_dir.path())),
        PollConfig::default(),
    );
    let report = poller.run_cycle();

    assert_eq!(report.fetched_ok, 5);
    assert_eq!(report.edges_written, 1);
    assert_eq!(report.storage_errors, 0);
    assert_eq!(
        api.hits(),
        vec![
            "/api/mempool",
            "/api/v1/fees/recommended",
            "/api/v1/fees/precise",
            "/api/v1/fees/mempool-blocks",
            "/api/v1/replacements",
        ]
    );

    assert_eq!(sqlite_count(&db, "SELECT COUNT(*) FROM api_snapshots WHERE success = 1"), 5);
    assert_eq!(
        sqlite_count(
            &db,
            "SELECT COUNT(*) FROM replacement_events WHERE old_txid = 'old1' AND new_txid = 'new1' \
             AND old_fee_sat = 300 AND new_fee_sat = 500 AND interval_seconds = 100 \
             AND full_rbf = 0 AND event_time = 1000"
        ),
        1
    );

    for name in ["mempool", "fees", "fees_precise", "mempool_blocks", "replacements"] {
        let text = std::fs::read_to_string(temp_dir.path().join(format!("{}.jsonl", name))).unwrap();
        assert_eq!(text.lines().count(), 1, "{}", name);
        let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["observed_at"], report.observed_at.as_str());
    }
}

#[test]
fn test_status_failure_after_retries_is_stored_as_failed_snapshot() {
    let mut routes = healthy_routes();
    routes[1] = ("/api/v1/fees/recommended", 503, "Service Unavailable");
    let api = MockApi::start(routes);
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("mempool.db");

    let sleeper = RecordingSleeper::new();
    let fetcher = RetryingFetcher::new(client(&api), sleeper.clone(), RetryConfig::new(2, 0.5, 8.0).unwrap());
    let mut poller = Poller::new(
        fetcher,
        open_store(db.to_str().unwrap()).unwrap(),
        None,
        PollConfig::default(),
    );
    let report = poller.run_cycle();

    assert_eq!(report.fetched_err, 1);
    assert_eq!(
        sleeper.sleeps(),
        vec![Duration::from_millis(500), Duration::from_secs(1)]
    );
    let fee_hits = api
        .hits()
        .iter()
        .filter(|p| p.as_str() == "/api/v1/fees/recommended")
        .count();
    assert_eq!(fee_hits, 3);
    assert_eq!(
        sqlite_count(
            &db,
            "SELECT COUNT(*) FROM api_snapshots WHERE endpoint = 'fees' AND success = 0 \
             AND error = 'HTTP Error 503' AND data_json IS NULL AND latency_ms IS NULL"
        ),
        1
    );
    assert!(!temp_dir.path().join("fees.jsonl").exists());
}

#[test]
fn test_backfill_after_poll_fetches_both_txids() {
    let mut routes = healthy_routes();
    routes.push(("/api/tx/new1", 200, r#"{"txid":"new1","fee":500}"#));
    routes.push(("/api/tx/old1", 404, "Transaction not found"));
    let api = MockApi::start(routes);
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("mempool.db");
    let db_url = format!("sqlite://{}", db.display());

    let fetcher = RetryingFetcher::new(client(&api), RecordingSleeper::new(), RetryConfig::default());
    let mut poller = Poller::new(fetcher, open_store(&db_url).unwrap(), None, PollConfig::default());
    poller.run_cycle();

    let mut backfill = TxDetailBackfill::new(
        client(&api),
        RecordingSleeper::new(),
        open_store(&db_url).unwrap(),
        Some(JsonlSink::new(temp_dir.path())),
        TxDetailOptions::new(TxidSelection::Pending),
    );
    let report = backfill.run().unwrap();
    assert_eq!((report.ok, report.failed), (1, 1));

    let old = backfill.store_mut().tx_detail("old1").unwrap().unwrap();
    assert_eq!(old.status_code, Some(404));
    assert_eq!(old.error.as_deref(), Some("Transaction not found"));

    // old1 failed, so it stays pending; new1 is done.
    assert_eq!(backfill.candidates().unwrap(), vec!["old1".to_string()]);
}

#[test]
fn test_deep_replacement_chain_is_truncated_not_dropped() {
    // 300 nested nodes: far past serde_json's default recursion limit.
    let mut deep = String::from("[");
    for i in 0..299 {
        deep.push_str(&format!(r#"{{"tx":{{"txid":"n{}","fee":{}}},"replaces":["#, i, 1000 - i));
    }
    deep.push_str(r#"{"tx":{"txid":"n299"}}"#);
    deep.push_str(&"]}".repeat(299));
    deep.push(']');

    let mut routes: Vec<(&str, u16, &str)> = healthy_routes();
    routes[4].2 = &deep;
    let api = MockApi::start(routes);
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("mempool.db");

    let fetcher = RetryingFetcher::new(client(&api), RecordingSleeper::new(), RetryConfig::default());
    let mut poller = Poller::new(
        fetcher,
        open_store(db.to_str().unwrap()).unwrap(),
        None,
        PollConfig::default(),
    );
    let report = poller.run_cycle();

    assert_eq!(report.fetched_ok, 5);
    assert_eq!(report.edges_written, mempool_watch::flatten::MAX_REPLACEMENT_DEPTH);
    assert_eq!(
        sqlite_count(&db, "SELECT COUNT(*) FROM api_snapshots WHERE endpoint = 'replacements' AND success = 1"),
        1
    );
    assert_eq!(
        sqlite_count(&db, "SELECT COUNT(*) FROM replacement_events WHERE new_txid = 'n0' AND old_txid = 'n1'"),
        1
    );
    assert_eq!(sqlite_count(&db, "SELECT COUNT(*) FROM replacement_events WHERE old_txid = 'n257'"), 0);
}

#![allow(dead_code)]
//! Shared helpers for integration tests.
//!
//! - [`MockApi`]: a local HTTP server answering canned JSON per request path
//! - [`sqlite_count`]: row counts straight from a SQLite file

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

/// Canned response for one path.
#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
}

/// Local HTTP/1.1 server with one canned response per path.
///
/// Every connection is closed after a single response; unknown paths get
/// `404 Not Found`.
pub struct MockApi {
    base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl MockApi {
    pub fn start(routes: Vec<(&str, u16, &str)>) -> Self {
        let routes: HashMap<String, Route> = routes
            .into_iter()
            .map(|(path, status, body)| {
                (
                    path.to_string(),
                    Route {
                        status,
                        body: body.to_string(),
                    },
                )
            })
            .collect();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(Mutex::new(Vec::new()));
        let server_hits = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) => break,
                        Ok(_) if header == "\r\n" || header == "\n" => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }

                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                server_hits.lock().unwrap().push(path.clone());

                let route = routes.get(&path).cloned().unwrap_or(Route {
                    status: 404,
                    body: "Not Found".to_string(),
                });
                let reason = if route.status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    route.status,
                    reason,
                    route.body.len(),
                    route.body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { base_url, hits }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requested paths in arrival order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

/// Sample `/api/v1/replacements` payload: one tree, one edge.
pub const REPLACEMENTS_BODY: &str = r#"[{"tx":{"txid":"new1","fee":500,"vsize":200},"time":1000,"replaces":[{"tx":{"txid":"old1","fee":300,"vsize":200},"time":900,"interval":100,"fullRbf":false}]}]"#;

/// Routes for every polled endpoint, all successful.
pub fn healthy_routes() -> Vec<(&'static str, u16, &'static str)> {
    vec![
        ("/api/mempool", 200, r#"{"count":3,"vsize":600,"total_fee":1500}"#),
        ("/api/v1/fees/recommended", 200, r#"{"fastestFee":5,"halfHourFee":4,"hourFee":3}"#),
        ("/api/v1/fees/precise", 200, r#"{"fastestFee":5.1,"halfHourFee":4.2}"#),
        ("/api/v1/fees/mempool-blocks", 200, r#"[{"blockSize":1000,"nTx":3}]"#),
        ("/api/v1/replacements", 200, REPLACEMENTS_BODY),
    ]
}

pub fn sqlite_count(db: &Path, sql: &str) -> i64 {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

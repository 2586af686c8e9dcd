//! Single-attempt HTTP JSON client.
//!
//! One GET, one outcome: no retries happen at this layer. See
//! [`RetryingFetcher`](crate::retry::RetryingFetcher) for the retry loop.

use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::FetchError;

/// Identifying client header sent with every request.
pub const USER_AGENT: &str = "mempool-watcher/1.0";

/// Deepest JSON nesting accepted in a response body.
///
/// A replacement tree spends two levels per node (the node object and its
/// `replaces` array), so bodies well past the flattener's depth cap still
/// decode and get truncated there instead of failing here.
pub const MAX_JSON_DEPTH: usize = 1024;

/// Certificate verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Standard certificate and hostname verification.
    #[default]
    Verify,
    /// Skip verification entirely (explicit opt-in, logged).
    Insecure,
}

/// A decoded JSON body and the wall-clock time spent fetching it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub value: Value,
    /// Request plus full body read, in whole milliseconds.
    pub latency_ms: u64,
}

/// Anything that can GET a path and decode a JSON body.
pub trait Fetch {
    fn fetch(&self, path: &str) -> Result<Fetched, FetchError>;
}

/// Blocking HTTP client for a single API base URL.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    agent: ureq::Agent,
    tls_mode: TlsMode,
}

impl HttpClient {
    /// Default per-request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration, tls_mode: TlsMode) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: Self::build_agent(timeout, tls_mode)?,
            tls_mode,
        })
    }

    fn build_agent(timeout: Duration, tls_mode: TlsMode) -> Result<ureq::Agent, FetchError> {
        let mut builder = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT);

        if tls_mode == TlsMode::Insecure {
            warn!("TLS certificate verification is disabled (--insecure)");
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| FetchError::Transport(format!("failed to build TLS connector: {}", e)))?;
            builder = builder.tls_connector(Arc::new(connector));
        }

        Ok(builder.build())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tls_mode(&self) -> TlsMode {
        self.tls_mode
    }

    /// Full URL for a path (`base` without trailing slash + `path`).
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Fetch for HttpClient {
    fn fetch(&self, path: &str) -> Result<Fetched, FetchError> {
        let url = self.url_for(path);
        let start = Instant::now();

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| FetchError::from_ureq(&url, e))?;

        // into_string() caps bodies at 10MB; replacement payloads can be large.
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| FetchError::Transport(format!("failed to read body of {}: {}", url, e)))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let value = decode_body(&url, &body)?;
        Ok(Fetched { value, latency_ms })
    }
}

/// True when `body` opens more than `limit` nested arrays/objects.
/// Brackets inside string literals are ignored.
fn exceeds_depth(body: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in body.bytes() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

/// Parse a body without serde_json's 128-level recursion limit.
///
/// Nesting is bounded by [`MAX_JSON_DEPTH`] up front; `serde_stacker` grows
/// the stack while descending.
fn decode_body(url: &str, body: &str) -> Result<Value, FetchError> {
    if exceeds_depth(body, MAX_JSON_DEPTH) {
        return Err(FetchError::Decode(format!(
            "JSON from {} nested deeper than {} levels",
            url, MAX_JSON_DEPTH
        )));
    }

    let invalid = |e: serde_json::Error| FetchError::Decode(format!("invalid JSON from {}: {}", url, e));
    let mut json = serde_json::Deserializer::from_str(body);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json)).map_err(invalid)?;
    json.end().map_err(invalid)?;
    Ok(value)
}

//! Test doubles for the transport layer.
//!
//! [`ScriptedFetch`] replays queued outcomes instead of touching the network
//! and [`RecordingSleeper`] records requested sleeps instead of blocking.
//! Both are cheap to clone; clones share state so a test can keep a handle
//! after moving one into a fetcher.
//!
//! ```ignore
//! let fetch = ScriptedFetch::new();
//! fetch.push_err(FetchError::Transport("timed out".into()));
//! fetch.push_ok(json!({"count": 1}), 12);
//! let fetcher = RetryingFetcher::new(fetch.clone(), RecordingSleeper::new(), RetryConfig::default());
//! ```

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::http::{Fetch, Fetched};
use crate::retry::Sleeper;

type Outcome = Result<Fetched, FetchError>;

#[derive(Default)]
struct Script {
    default: VecDeque<Outcome>,
    by_path: HashMap<String, VecDeque<Outcome>>,
    requested: Vec<String>,
}

/// A [`Fetch`] that pops pre-recorded outcomes.
///
/// Outcomes queued for a specific path take precedence over the shared
/// queue. An empty script yields a transport error.
#[derive(Clone, Default)]
pub struct ScriptedFetch {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, value: Value, latency_ms: u64) {
        self.script
            .lock()
            .default
            .push_back(Ok(Fetched { value, latency_ms }));
    }

    pub fn push_err(&self, err: FetchError) {
        self.script.lock().default.push_back(Err(err));
    }

    pub fn push_ok_for(&self, path: &str, value: Value, latency_ms: u64) {
        self.script
            .lock()
            .by_path
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(Fetched { value, latency_ms }));
    }

    pub fn push_err_for(&self, path: &str, err: FetchError) {
        self.script
            .lock()
            .by_path
            .entry(path.to_string())
            .or_default()
            .push_back(Err(err));
    }

    /// Total number of fetch calls so far.
    pub fn calls(&self) -> usize {
        self.script.lock().requested.len()
    }

    /// Number of fetch calls for one path.
    pub fn calls_for(&self, path: &str) -> usize {
        self.script
            .lock()
            .requested
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    /// Requested paths in call order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.script.lock().requested.clone()
    }
}

impl Fetch for ScriptedFetch {
    fn fetch(&self, path: &str) -> Result<Fetched, FetchError> {
        let mut script = self.script.lock();
        script.requested.push(path.to_string());
        let queued = script.by_path.get_mut(path).and_then(|q| q.pop_front());
        let next = match queued {
            Some(outcome) => Some(outcome),
            None => script.default.pop_front(),
        };
        next.unwrap_or_else(|| Err(FetchError::Transport(format!("no scripted response for {}", path))))
    }
}

/// A [`Sleeper`] that records durations and returns immediately.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

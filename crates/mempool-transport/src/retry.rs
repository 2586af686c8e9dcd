//! Bounded exponential-backoff wrapper around a [`Fetch`] implementation.

use mempool_watch_types::RetryConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::http::Fetch;

/// Something that can block the current thread for a while.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Successful result of [`RetryingFetcher::fetch_with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetriedFetch {
    pub value: Value,
    /// Latency of the attempt that succeeded.
    pub latency_ms: u64,
    /// Number of backoff sleeps taken before the success.
    pub retries_used: usize,
}

/// Retries a fetch up to `config.retries` extra times.
///
/// Attempt 0 runs immediately. After the n-th failure (n starting at 1) the
/// fetcher sleeps `config.backoff_delay(n)` and tries again, until the
/// failure count exceeds `config.retries`; then the last error is returned
/// as-is.
pub struct RetryingFetcher<F, S = ThreadSleeper> {
    inner: F,
    sleeper: S,
    config: RetryConfig,
}

impl<F: Fetch, S: Sleeper> RetryingFetcher<F, S> {
    pub fn new(inner: F, sleeper: S, config: RetryConfig) -> Self {
        Self {
            inner,
            sleeper,
            config,
        }
    }

    pub fn fetch_with_retry(&self, path: &str) -> Result<RetriedFetch, FetchError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.fetch(path) {
                Ok(fetched) => {
                    return Ok(RetriedFetch {
                        value: fetched.value,
                        latency_ms: fetched.latency_ms,
                        retries_used: attempt,
                    })
                }
                Err(err) => {
                    attempt += 1;
                    if attempt > self.config.retries {
                        return Err(err);
                    }
                    let delay = self.config.backoff_delay(attempt);
                    debug!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "fetch failed, backing off"
                    );
                    self.sleeper.sleep(delay);
                }
            }
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

//! Mempool Transport Layer
//!
//! Blocking HTTP transport for the mempool.space REST API.
//!
//! This crate provides:
//! - [`http`]: a single-attempt JSON client ([`HttpClient`]) with latency accounting
//! - [`retry`]: a bounded, unjittered exponential-backoff wrapper ([`RetryingFetcher`])
//! - `test_utils` (feature `test-utils`): scripted fetch and sleep doubles for tests
//!
//! # Example
//!
//! ```ignore
//! use mempool_transport::{HttpClient, RetryingFetcher, ThreadSleeper, TlsMode};
//! use mempool_watch_types::RetryConfig;
//!
//! let client = HttpClient::new("https://mempool.space", Duration::from_secs(15), TlsMode::Verify)?;
//! let fetcher = RetryingFetcher::new(client, ThreadSleeper, RetryConfig::default());
//! let fees = fetcher.fetch_with_retry("/api/v1/fees/recommended")?;
//! println!("{} ({} ms)", fees.value, fees.latency_ms);
//! ```

pub mod error;
pub mod http;
pub mod retry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types for convenience
pub use error::FetchError;
pub use http::{Fetch, Fetched, HttpClient, TlsMode, USER_AGENT};
pub use retry::{RetriedFetch, RetryingFetcher, Sleeper, ThreadSleeper};

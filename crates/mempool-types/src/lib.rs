//! Shared types for the mempool-watch workspace.
//!
//! This crate provides the records that flow between the fetcher, the
//! replacement flattener and the storage backends:
//!
//! - [`Endpoint`](endpoint::Endpoint) - the fixed set of polled API endpoints
//! - [`Snapshot`](records::Snapshot) - one fetch outcome for one endpoint
//! - [`ReplacementEdge`](records::ReplacementEdge) - one old -> new fee bump
//! - [`TransactionDetail`](records::TransactionDetail) - fetched detail for a txid

pub mod endpoint;
pub mod json;
pub mod records;

pub use endpoint::{tx_detail_path, Endpoint};
pub use json::{to_ascii_json, truncate_chars};
pub use records::{
    utc_now_iso, ReplacementEdge, Snapshot, SnapshotOutcome, TransactionDetail,
    MAX_DETAIL_ERROR_CHARS,
};

use std::time::{Duration, TryFromFloatSecsError};

/// Convert a seconds value from configuration into a [`Duration`].
///
/// Negative values (and NaN) clamp to zero; infinite values or values too
/// large for a `Duration` are an error.
pub fn duration_from_secs(secs: f64) -> Result<Duration, TryFromFloatSecsError> {
    Duration::try_from_secs_f64(secs.max(0.0))
}

/// Configuration for retry behavior on network operations.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RetryConfig {
    /// Number of retry attempts after the first one.
    pub retries: usize,
    /// Backoff before the first retry; doubled for every later retry.
    pub backoff_base: Duration,
    /// Upper bound for any single backoff.
    pub backoff_max: Duration,
}

impl RetryConfig {
    /// Create a new RetryConfig from second-valued backoff parameters.
    pub fn new(
        retries: usize,
        backoff_base_secs: f64,
        backoff_max_secs: f64,
    ) -> Result<Self, TryFromFloatSecsError> {
        Ok(Self {
            retries,
            backoff_base: duration_from_secs(backoff_base_secs)?,
            backoff_max: duration_from_secs(backoff_max_secs)?,
        })
    }

    /// Delay slept before retry number `attempt` (1-based).
    ///
    /// `min(backoff_base * 2^(attempt-1), backoff_max)`, no jitter.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 1).min(63) as i32;
        let scaled = self.backoff_base.as_secs_f64() * 2f64.powi(exponent);
        let capped = scaled.min(self.backoff_max.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.backoff_max)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_capped() {
        let config = RetryConfig::new(6, 0.5, 3.0).unwrap();
        assert_eq!(config.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(4), Duration::from_secs(3));
        assert_eq!(config.backoff_delay(6), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_huge_attempt_stays_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_delay(500), Duration::from_secs(8));
        assert_eq!(config.backoff_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_unrepresentable_backoff_is_an_error() {
        assert!(RetryConfig::new(3, f64::INFINITY, 8.0).is_err());
        assert!(RetryConfig::new(3, 0.5, 1e30).is_err());
        let config = RetryConfig::new(3, -1.0, f64::NAN).unwrap();
        assert_eq!(config.backoff_base, Duration::ZERO);
        assert_eq!(config.backoff_max, Duration::ZERO);
    }

    #[test]
    fn test_backoff_near_duration_max_does_not_panic() {
        let config = RetryConfig::new(3, 1e19, 1.8e19).unwrap();
        assert_eq!(config.backoff_delay(40), config.backoff_max);
    }
}

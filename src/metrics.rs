//! Running fetch counters for one poll session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Totals across every cycle of a run.
///
/// Recorded once per endpoint fetch outcome (not per retry attempt).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_ok: u64,
    pub total_err: u64,
    /// Sum of the latencies of successful fetches.
    pub total_latency_ms: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful fetch.
    pub fn record_success(&mut self, latency_ms: u64) {
        self.total_ok += 1;
        self.total_latency_ms = self.total_latency_ms.saturating_add(latency_ms);
    }

    /// Record a fetch that failed after all retries.
    pub fn record_failure(&mut self) {
        self.total_err += 1;
    }

    pub fn total(&self) -> u64 {
        self.total_ok + self.total_err
    }

    /// Success percentage in `[0, 100]`; 0 before anything was recorded.
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.total_ok as f64 / total as f64 * 100.0
    }

    /// Mean latency of successful fetches, truncated to whole milliseconds.
    pub fn avg_latency_ms(&self) -> u64 {
        if self.total_ok == 0 {
            return 0;
        }
        self.total_latency_ms / self.total_ok
    }

    /// One-line summary: `success=N error=M rate=X.X% avg_latency_ms=L`.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "success={} error={} rate={:.1}% avg_latency_ms={}",
            self.total_ok,
            self.total_err,
            self.success_rate(),
            self.avg_latency_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let metrics = RunMetrics::new();
        assert_eq!(metrics.summary(), "success=0 error=0 rate=0.0% avg_latency_ms=0");
    }

    #[test]
    fn test_summary_after_mixed_outcomes() {
        let mut metrics = RunMetrics::new();
        metrics.record_success(100);
        metrics.record_success(51);
        metrics.record_failure();

        assert_eq!(metrics.total(), 3);
        assert_eq!(metrics.avg_latency_ms(), 75);
        assert_eq!(metrics.summary(), "success=2 error=1 rate=66.7% avg_latency_ms=75");
    }
}

//! The fixed set of upstream endpoints polled every cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A polled mempool API endpoint.
///
/// Variants are declared in poll order; [`Endpoint::ALL`] preserves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Mempool,
    Fees,
    FeesPrecise,
    MempoolBlocks,
    Replacements,
}

impl Endpoint {
    /// All endpoints in poll order.
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Mempool,
        Endpoint::Fees,
        Endpoint::FeesPrecise,
        Endpoint::MempoolBlocks,
        Endpoint::Replacements,
    ];

    /// Name stored in `api_snapshots.endpoint`.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Mempool => "mempool",
            Endpoint::Fees => "fees",
            Endpoint::FeesPrecise => "fees_precise",
            Endpoint::MempoolBlocks => "mempool_blocks",
            Endpoint::Replacements => "replacements",
        }
    }

    /// Request path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Mempool => "/api/mempool",
            Endpoint::Fees => "/api/v1/fees/recommended",
            Endpoint::FeesPrecise => "/api/v1/fees/precise",
            Endpoint::MempoolBlocks => "/api/v1/fees/mempool-blocks",
            Endpoint::Replacements => "/api/v1/replacements",
        }
    }

    /// File name of the append-only JSONL sink for this endpoint.
    pub fn jsonl_file_name(self) -> String {
        format!("{}.jsonl", self.name())
    }
}

/// Request path for the per-transaction detail endpoint.
pub fn tx_detail_path(txid: &str) -> String {
    format!("/api/tx/{}", txid)
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| format!("unknown endpoint: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(endpoint.name().parse::<Endpoint>().unwrap(), endpoint);
        }
        assert!("blocks".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_paths_and_files() {
        assert_eq!(Endpoint::Replacements.path(), "/api/v1/replacements");
        assert_eq!(Endpoint::FeesPrecise.jsonl_file_name(), "fees_precise.jsonl");
        assert_eq!(tx_detail_path("abc"), "/api/tx/abc");
    }
}

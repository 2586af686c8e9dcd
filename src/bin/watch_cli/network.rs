//! Upstream connection options shared by the fetching subcommands.

use anyhow::{Context, Result};
use clap::Args;
use mempool_transport::{HttpClient, TlsMode};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://mempool.space";

#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// API base URL
    #[arg(long, env = "MEMPOOL_WATCH_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "MEMPOOL_WATCH_TIMEOUT", default_value_t = HttpClient::DEFAULT_TIMEOUT_SECS, value_name = "SECS")]
    pub timeout: u64,

    /// Disable TLS certificate and hostname verification (not recommended)
    #[arg(long, default_value_t = false)]
    pub insecure: bool,
}

impl NetworkArgs {
    pub fn client(&self) -> Result<HttpClient> {
        let tls_mode = if self.insecure {
            TlsMode::Insecure
        } else {
            TlsMode::Verify
        };
        HttpClient::new(&self.base_url, Duration::from_secs(self.timeout), tls_mode)
            .with_context(|| format!("Failed to build HTTP client for {}", self.base_url))
    }
}

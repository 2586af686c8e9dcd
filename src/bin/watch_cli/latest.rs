//! `latest`: print the newest stored rows.

use anyhow::{Context, Result};
use clap::Args;
use mempool_store::open_store;
use mempool_watch::inspect::write_latest;

#[derive(Args, Debug)]
pub struct LatestCmd {
    /// Database to read (path or URL)
    #[arg(long, env = "MEMPOOL_WATCH_DB", default_value = "./data/mempool.db")]
    db: String,

    /// Rows per table
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

impl LatestCmd {
    pub fn execute(&self) -> Result<()> {
        let mut store =
            open_store(&self.db).with_context(|| format!("Failed to open store {}", self.db))?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        write_latest(store.as_mut(), self.limit, &mut out)
    }
}

//! CLI subcommand implementations for mempool-watch

pub mod latest;
pub mod network;
pub mod poll;
pub mod tx_details;

use clap::{Parser, ValueEnum};
use snaplink_stream::IngestMode;
use std::net::SocketAddr;

#[derive(Debug, Parser)]
#[command(name = "snaplink-gateway", about = "Snaplink URL shortener gateway")]
pub struct Args {
    /// Address the HTTP server binds to.
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    pub listen_addr: SocketAddr,

    /// Public base URL used when rendering short links.
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// How often each stream source polls, in milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// How table changes reach the consumers.
    #[arg(long, env = "INGEST_MODE", value_enum, default_value = "change-log")]
    pub ingest_mode: IngestArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IngestArg {
    /// Tail the tables' change logs with resumable cursors.
    ChangeLog,
    /// Re-scan the tables every cycle instead of tailing a log.
    Snapshot,
}

impl From<IngestArg> for IngestMode {
    fn from(arg: IngestArg) -> Self {
        match arg {
            IngestArg::ChangeLog => IngestMode::ChangeLog,
            IngestArg::Snapshot => IngestMode::Snapshot,
        }
    }
}

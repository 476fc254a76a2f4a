mod app;
mod cli;
mod error;
mod handlers;
mod model;
mod state;

use crate::app::App;
use crate::cli::Args;
use crate::state::AppState;
use clap::Parser;
use snaplink_consumers::{FaviconConsumer, HttpFaviconFetcher, StatsConsumer};
use snaplink_shortener::{RandomKeyGenerator, ShortenerService};
use snaplink_store::{MemoryChangeLog, MemoryObjectStore, MemoryTables};
use snaplink_store::{TABLE_CLICK_EVENTS, TABLE_URLS};
use snaplink_stream::{EventConsumer, Poller, Source};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let changelog = Arc::new(MemoryChangeLog::new());
    let tables = Arc::new(MemoryTables::with_changelog(changelog.clone()));
    let objects = Arc::new(MemoryObjectStore::new());
    let shortener = Arc::new(ShortenerService::new(
        tables.clone(),
        RandomKeyGenerator::default(),
    ));

    let favicon_consumer = Arc::new(FaviconConsumer::new(
        tables.clone(),
        objects,
        HttpFaviconFetcher::new(),
    ));
    let stats_consumer = Arc::new(StatsConsumer::new(tables.clone()));

    let interval = Duration::from_millis(args.poll_interval_ms);
    let sources = vec![
        Source::builder()
            .name("urls")
            .table(TABLE_URLS)
            .key_attribute("shortKey")
            .mode(args.ingest_mode.into())
            .interval(interval)
            .consumer(favicon_consumer as Arc<dyn EventConsumer>)
            .build(),
        Source::builder()
            .name("click_events")
            .table(TABLE_CLICK_EVENTS)
            .key_attribute("eventId")
            .mode(args.ingest_mode.into())
            .interval(interval)
            .consumer(stats_consumer as Arc<dyn EventConsumer>)
            .build(),
    ];
    let poller = Poller::new(changelog, tables.clone()).spawn(sources);

    let state = AppState::new(shortener, tables, args.base_url.clone());
    let listener = tokio::net::TcpListener::bind(args.listen_addr).await?;
    info!(
        listen_addr = %listener.local_addr()?,
        base_url = %args.base_url,
        ingest_mode = ?args.ingest_mode,
        "starting gateway server"
    );
    axum::serve(listener, App::router(state)).await?;

    poller.shutdown().await;
    Ok(())
}

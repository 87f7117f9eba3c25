use anyhow::Result;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

use xc2db::crawl_config::CrawlConfigFile;
use xc2db::memory_store::MemoryStore;
use xc2db::pg_store::PgStore;
use xc2db::recent::ingest_recent;
use xc2db::store::FlightStore;

use super::{connect_database, connect_gateway};

/// Ingest the newest page of each target. With `dry_run` nothing touches the
/// database; flights are resolved against an in-memory store and only counted.
pub async fn handle_recent(config: CrawlConfigFile, tz: Tz, dry_run: bool) -> Result<()> {
    let store: Arc<dyn FlightStore> = if dry_run {
        info!("Dry run: resolving against an in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(PgStore::new(connect_database().await?))
    };
    let gateway = connect_gateway().await?;

    let summary = ingest_recent(gateway, store, &config, tz).await?;
    info!(
        targets = summary.targets,
        failed = summary.failed,
        extracted = summary.extracted,
        inserted = summary.flights.inserted,
        skipped = summary.flights.skipped,
        dry_run,
        "Recent ingest finished"
    );
    Ok(())
}

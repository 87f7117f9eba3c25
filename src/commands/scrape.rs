use anyhow::Result;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

use xc2db::crawl_config::CrawlConfigFile;
use xc2db::pg_store::PgStore;
use xc2db::store::TaskLedger;
use xc2db::worker::Worker;

use super::{connect_database, connect_gateway};

pub async fn handle_scrape(config: CrawlConfigFile, tz: Tz) -> Result<()> {
    let pool = connect_database().await?;
    let gateway = connect_gateway().await?;
    let store = Arc::new(PgStore::new(pool));

    let before = store.task_counts().await?;
    info!(
        pending = before.pending,
        processed = before.processed,
        "Scrape task ledger before run"
    );
    if before.pending == 0 {
        info!("Nothing to scrape; run populate first");
        return Ok(());
    }

    let mut worker = Worker::new(gateway, store.clone(), store.clone(), config, tz);
    let summary = worker.run().await?;

    let after = store.task_counts().await?;
    let (pilots, gliders, takeoffs, flights) = store.entity_counts().await?;
    info!(
        completed = summary.tasks_completed,
        failed = summary.tasks_failed,
        pages = summary.pages,
        inserted = summary.flights.inserted,
        skipped = summary.flights.skipped,
        pending = after.pending,
        processed = after.processed,
        "Scrape run finished"
    );
    info!(pilots, gliders, takeoffs, flights, "Stored totals");
    Ok(())
}

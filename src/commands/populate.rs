use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use xc2db::crawl_config::CrawlConfigFile;
use xc2db::pg_store::PgStore;
use xc2db::scheduler::Scheduler;
use xc2db::store::TaskLedger;

use super::{connect_database, connect_gateway};

pub async fn handle_populate(config: CrawlConfigFile) -> Result<()> {
    info!("Starting populate for {} target(s)", config.targets.len());

    let pool = connect_database().await?;
    let gateway = connect_gateway().await?;
    let store = Arc::new(PgStore::new(pool));

    let scheduler = Scheduler::new(gateway, store.clone(), config);
    let summary = scheduler
        .populate()
        .await
        .context("Failed to schedule scrape tasks")?;

    let counts = store.task_counts().await?;
    info!(
        targets = summary.targets,
        planned = summary.planned,
        created = summary.created,
        pending = counts.pending,
        processed = counts.processed,
        "Populate finished"
    );
    Ok(())
}

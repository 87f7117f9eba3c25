use anyhow::Context;
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::crawl_config::CrawlConfigFile;
use crate::delay::{DelayPolicy, pause};
use crate::extractor::{
    ExtractError, ListingContext, PAGE_SIZE, extract_flights, extract_last_offset, listing_url,
};
use crate::gateway::{ContentFetcher, GatewayError};
use crate::resolver::{EntityResolver, IngestStats};
use crate::scrape_tasks::ScrapeTask;
use crate::store::{FlightStore, StoreError, TaskLedger};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CrawlError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::Gateway(e) if e.is_fatal())
    }
}

/// Where in a task processing stopped
#[derive(Debug, Error)]
#[error("task {task_id} failed at offset {offset} ({url}): {source}")]
pub struct TaskFailure {
    pub task_id: i64,
    pub url: String,
    pub offset: u32,
    #[source]
    pub source: CrawlError,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub pages: usize,
    pub flights: IngestStats,
}

/// Works through the unprocessed scrape tasks one at a time
pub struct Worker {
    fetcher: Arc<dyn ContentFetcher>,
    ledger: Arc<dyn TaskLedger>,
    resolver: EntityResolver,
    config: CrawlConfigFile,
    tz: Tz,
    page_delay: Box<dyn DelayPolicy>,
    task_delay: Box<dyn DelayPolicy>,
}

impl Worker {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        ledger: Arc<dyn TaskLedger>,
        store: Arc<dyn FlightStore>,
        config: CrawlConfigFile,
        tz: Tz,
    ) -> Self {
        let page_delay = Box::new(config.page_delay.policy());
        let task_delay = Box::new(config.task_delay.policy());
        Self {
            fetcher,
            ledger,
            resolver: EntityResolver::new(store),
            config,
            tz,
            page_delay,
            task_delay,
        }
    }

    pub fn with_delays(
        mut self,
        page_delay: impl DelayPolicy + 'static,
        task_delay: impl DelayPolicy + 'static,
    ) -> Self {
        self.page_delay = Box::new(page_delay);
        self.task_delay = Box::new(task_delay);
        self
    }

    /// Process every pending task in random order.
    ///
    /// A failed task is logged and left pending for the next run. Only a fatal
    /// gateway error ends the run early.
    pub async fn run(&mut self) -> anyhow::Result<ScrapeSummary> {
        let mut tasks = self
            .ledger
            .pending_tasks()
            .await
            .context("Failed to load pending scrape tasks")?;
        tasks.shuffle(&mut rand::rng());
        info!(pending = tasks.len(), "Starting scrape run");

        let mut summary = ScrapeSummary::default();
        for (index, task) in tasks.iter().enumerate() {
            match self.process_task(task, &mut summary).await {
                Ok(stats) => {
                    summary.tasks_completed += 1;
                    info!(
                        task_id = task.id,
                        url = %task.url,
                        date = %task.date,
                        inserted = stats.inserted,
                        skipped = stats.skipped,
                        "Task complete"
                    );
                }
                Err(failure) if failure.source.is_fatal() => {
                    error!(
                        task_id = failure.task_id,
                        url = %failure.url,
                        offset = failure.offset,
                        error = %failure.source,
                        "No usable network path, aborting run"
                    );
                    return Err(failure.into());
                }
                Err(failure) => {
                    summary.tasks_failed += 1;
                    metrics::counter!("xc2db.tasks.failed_total").increment(1);
                    error!(
                        task_id = failure.task_id,
                        url = %failure.url,
                        offset = failure.offset,
                        error = %failure.source,
                        "Task failed, leaving it pending"
                    );
                }
            }

            pause(self.task_delay.as_ref(), index as u32).await;
        }

        Ok(summary)
    }

    /// Page through one task in ascending offset order, then mark it processed
    async fn process_task(
        &mut self,
        task: &ScrapeTask,
        summary: &mut ScrapeSummary,
    ) -> Result<IngestStats, TaskFailure> {
        let ctx = ListingContext::new(
            self.config.variant_for(&task.url),
            &self.config.region,
            self.tz,
        );
        let fail = |offset: u32, source: CrawlError| TaskFailure {
            task_id: task.id,
            url: task.url.clone(),
            offset,
            source,
        };

        let mut stats = IngestStats::default();
        let (first, last_offset) = self
            .crawl_page(task, &ctx, 0)
            .await
            .map_err(|e| fail(0, e))?;
        stats += first;
        summary.pages += 1;

        let mut fetched = 0;
        let mut offset = PAGE_SIZE;
        let mut page = 0;
        while offset <= last_offset {
            let (page_stats, _) = self
                .crawl_page(task, &ctx, offset)
                .await
                .map_err(|e| fail(offset, e))?;
            stats += page_stats;
            summary.pages += 1;
            fetched = offset;

            pause(self.page_delay.as_ref(), page).await;
            page += 1;
            offset += PAGE_SIZE;
        }

        let marked = self
            .ledger
            .mark_processed(task.id)
            .await
            .map_err(|e| fail(fetched, e.into()))?;
        if !marked {
            warn!(task_id = task.id, "Task was already marked processed");
        }

        summary.flights += stats;
        metrics::counter!("xc2db.tasks.completed_total").increment(1);
        Ok(stats)
    }

    /// Fetch, extract and persist one page. Returns the page's ingest counts
    /// and the last offset shown by its pager.
    async fn crawl_page(
        &mut self,
        task: &ScrapeTask,
        ctx: &ListingContext,
        offset: u32,
    ) -> Result<(IngestStats, u32), CrawlError> {
        let url = listing_url(&task.url, task.date_filter(), offset);
        let html = self.fetcher.fetch(&self.config.render_request(&url)).await?;

        let flights = extract_flights(&html, ctx)?;
        let last_offset = extract_last_offset(&html);
        metrics::counter!("xc2db.pages.fetched_total").increment(1);

        let stats = self.resolver.ingest_page(&flights).await?;
        info!(
            task_id = task.id,
            offset,
            rows = flights.len(),
            inserted = stats.inserted,
            "Page ingested"
        );
        Ok((stats, last_offset))
    }
}

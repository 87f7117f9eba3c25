//! Splits crawl targets into scrape tasks small enough to page through.
//!
//! The site only pages through the first `DISPLAY_CAP_ROWS` rows of any view.
//! A target whose pager reaches the last full page before the cap is split
//! into one task per day offered by its date filter.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::crawl_config::{CrawlConfigFile, CrawlTarget};
use crate::delay::{DelayPolicy, pause};
use crate::extractor::{PAGE_SIZE, extract_available_dates, extract_last_offset};
use crate::gateway::{ContentFetcher, GatewayError};
use crate::scrape_tasks::NewScrapeTask;
use crate::store::{StoreError, TaskLedger};

/// Rows the site will page through for a single filtered view
pub const DISPLAY_CAP_ROWS: u32 = 2000;

/// Last-page offsets at or past this mean the view may be truncated
pub const SPLIT_THRESHOLD: u32 = DISPLAY_CAP_ROWS - PAGE_SIZE;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{url} needs splitting by date but no dates were offered after {attempts} attempts")]
    NoDateSplit { url: String, attempts: u32 },

    #[error("{url} could not be fetched after {attempts} attempts: {source}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopulateSummary {
    pub targets: usize,
    pub planned: usize,
    /// Planned tasks not already in the ledger
    pub created: usize,
}

pub struct Scheduler {
    fetcher: Arc<dyn ContentFetcher>,
    ledger: Arc<dyn TaskLedger>,
    config: CrawlConfigFile,
    backoff: Box<dyn DelayPolicy>,
}

impl Scheduler {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        ledger: Arc<dyn TaskLedger>,
        config: CrawlConfigFile,
    ) -> Self {
        let backoff = Box::new(config.retry_backoff.policy());
        Self {
            fetcher,
            ledger,
            config,
            backoff,
        }
    }

    pub fn with_backoff(mut self, backoff: impl DelayPolicy + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Plan every configured target and record the tasks. Stops at the first
    /// target that can't be planned.
    pub async fn populate(&self) -> Result<PopulateSummary, SchedulerError> {
        let mut summary = PopulateSummary::default();

        for target in &self.config.targets {
            let tasks = self.plan_target(target).await?;
            let created = self.ledger.insert_tasks(&tasks).await?;

            info!(
                url = %target.url,
                variant = %target.variant(),
                planned = tasks.len(),
                created,
                "Scheduled scrape tasks"
            );
            metrics::counter!("xc2db.tasks.created_total").increment(created as u64);

            summary.targets += 1;
            summary.planned += tasks.len();
            summary.created += created;
        }

        Ok(summary)
    }

    /// Decide how to split one target.
    ///
    /// An overview page past the split threshold that shows no dates is a
    /// half-rendered page; it is fetched again after a backoff until the retry
    /// budget runs out. Failed fetches use the same budget unless they are fatal.
    /// If no overview was ever read the last fetch error is returned.
    pub async fn plan_target(&self, target: &CrawlTarget) -> Result<Vec<NewScrapeTask>, SchedulerError> {
        let attempts = self.config.retry_budget.max(1);
        let mut last_error = None;
        let mut truncated = false;

        for attempt in 0..attempts {
            if attempt > 0 {
                pause(self.backoff.as_ref(), attempt - 1).await;
            }

            let html = match self
                .fetcher
                .fetch(&self.config.render_request(&target.url))
                .await
            {
                Ok(html) => html,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(url = %target.url, attempt, error = %e, "Overview fetch failed");
                    last_error = Some(e);
                    continue;
                }
            };

            let last_offset = extract_last_offset(&html);
            if last_offset < SPLIT_THRESHOLD {
                info!(url = %target.url, last_offset, "Target fits under the display cap");
                return Ok(vec![NewScrapeTask::whole(&target.url)]);
            }

            truncated = true;
            let dates = extract_available_dates(&html);
            if !dates.is_empty() {
                info!(
                    url = %target.url,
                    last_offset,
                    dates = dates.len(),
                    "Splitting target by date"
                );
                return Ok(dates
                    .iter()
                    .map(|date| NewScrapeTask::for_date(&target.url, date))
                    .collect());
            }

            warn!(
                url = %target.url,
                attempt,
                last_offset,
                "Date filter missing from overview, retrying"
            );
            metrics::counter!("xc2db.scheduler.retries_total").increment(1);
        }

        match last_error {
            Some(source) if !truncated => Err(SchedulerError::FetchExhausted {
                url: target.url.clone(),
                attempts,
                source,
            }),
            _ => Err(SchedulerError::NoDateSplit {
                url: target.url.clone(),
                attempts,
            }),
        }
    }
}

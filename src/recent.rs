//! One-shot ingest of the site's newest-first views, bypassing the task
//! ledger. Meant for frequent runs that only pick up new flights.

use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

use crate::crawl_config::CrawlConfigFile;
use crate::extractor::{ListingContext, extract_flights};
use crate::gateway::ContentFetcher;
use crate::resolver::{EntityResolver, IngestStats};
use crate::store::FlightStore;
use crate::worker::CrawlError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecentSummary {
    pub targets: usize,
    pub failed: usize,
    pub extracted: usize,
    pub flights: IngestStats,
}

/// Ingest the first page of every recent view. A target that fails is logged and
/// skipped; a fatal gateway error stops the run.
pub async fn ingest_recent(
    fetcher: Arc<dyn ContentFetcher>,
    store: Arc<dyn FlightStore>,
    config: &CrawlConfigFile,
    tz: Tz,
) -> Result<RecentSummary, CrawlError> {
    let mut resolver = EntityResolver::new(store);
    let mut summary = RecentSummary::default();

    for target in &config.recent_targets {
        summary.targets += 1;
        let ctx = ListingContext::new(target.variant(), &config.region, tz);

        let result: Result<(usize, IngestStats), CrawlError> = async {
            let html = fetcher.fetch(&config.render_request(&target.url)).await?;
            let flights = extract_flights(&html, &ctx)?;
            let stats = resolver.ingest_page(&flights).await?;
            Ok((flights.len(), stats))
        }
        .await;

        match result {
            Ok((extracted, stats)) => {
                info!(
                    url = %target.url,
                    variant = %ctx.variant,
                    extracted,
                    inserted = stats.inserted,
                    skipped = stats.skipped,
                    "Recent flights ingested"
                );
                summary.extracted += extracted;
                summary.flights += stats;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                summary.failed += 1;
                warn!(url = %target.url, error = %e, "Failed to ingest recent flights");
            }
        }
    }

    Ok(summary)
}

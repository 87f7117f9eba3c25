mod common;

use chrono_tz::Europe::Bucharest;
use common::{Scripted, ScriptedFetcher, fixture};
use std::sync::Arc;
use xc2db::crawl_config::{CrawlConfigFile, CrawlTarget, REGIONAL_RECENT_URL, WORLD_RECENT_URL};
use xc2db::extractor::ListingVariant;
use xc2db::memory_store::MemoryStore;
use xc2db::recent::ingest_recent;

#[tokio::test]
async fn test_recent_ingests_first_page_of_each_target() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .html(WORLD_RECENT_URL, fixture("recent_flights_world.html"))
            .html(REGIONAL_RECENT_URL, fixture("recent_flights_romania.html")),
    );

    let summary = ingest_recent(fetcher.clone(), store.clone(), &CrawlConfigFile::default(), Bucharest)
        .await
        .unwrap();

    assert_eq!(summary.targets, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.extracted, 6);
    assert_eq!(summary.flights.inserted, 6);
    // The world pager is ignored in recent mode
    assert_eq!(fetcher.requests().len(), 2);
    // The ledger is untouched
    assert!(store.tasks().await.is_empty());

    let again = ingest_recent(fetcher, store.clone(), &CrawlConfigFile::default(), Bucharest)
        .await
        .unwrap();
    assert_eq!(again.flights.inserted, 0);
    assert_eq!(again.flights.skipped, 6);
}

#[tokio::test]
async fn test_recent_skips_failed_target() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = ScriptedFetcher::new()
        .on(WORLD_RECENT_URL, Scripted::ApiError(503))
        .html(REGIONAL_RECENT_URL, fixture("recent_flights_romania.html"));

    let summary = ingest_recent(Arc::new(fetcher), store.clone(), &CrawlConfigFile::default(), Bucharest)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.flights.inserted, 3);
}

#[tokio::test]
async fn test_recent_stops_when_gateway_unavailable() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new().on(WORLD_RECENT_URL, Scripted::Unavailable));

    let err = ingest_recent(fetcher.clone(), store.clone(), &CrawlConfigFile::default(), Bucharest)
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(fetcher.requests(), vec![WORLD_RECENT_URL.to_string()]);
    assert!(store.flights().await.is_empty());
}

#[tokio::test]
async fn test_recent_ignores_crawl_targets() {
    // populate is pointed at a past season; recent still reads the newest views
    let config = CrawlConfigFile {
        targets: vec![CrawlTarget::new(
            "https://www.xcontest.org/2020/romania/zboruri/",
            ListingVariant::Regional,
        )],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .html(WORLD_RECENT_URL, fixture("recent_flights_world.html"))
            .html(REGIONAL_RECENT_URL, fixture("recent_flights_romania.html")),
    );

    let summary = ingest_recent(fetcher.clone(), store, &config, Bucharest)
        .await
        .unwrap();

    assert_eq!(summary.targets, 2);
    assert_eq!(summary.flights.inserted, 6);
    assert_eq!(
        fetcher.requests(),
        vec![WORLD_RECENT_URL.to_string(), REGIONAL_RECENT_URL.to_string()]
    );
}

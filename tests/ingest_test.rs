//! Listing pages through the extractor and resolver into the in-memory store
mod common;

use chrono_tz::Europe::Bucharest;
use common::fixture;
use std::sync::Arc;
use xc2db::extractor::{ListingContext, ListingVariant, extract_flights};
use xc2db::memory_store::MemoryStore;
use xc2db::resolver::{EntityResolver, IngestStats};

async fn ingest(store: &Arc<MemoryStore>, name: &str, variant: ListingVariant) -> IngestStats {
    let ctx = ListingContext::new(variant, "ro", Bucharest);
    let flights = extract_flights(&fixture(name), &ctx).unwrap();
    let mut resolver = EntityResolver::new(store.clone());
    resolver.ingest_page(&flights).await.unwrap()
}

#[tokio::test]
async fn test_world_page_creates_all_entities() {
    let store = Arc::new(MemoryStore::new());

    let stats = ingest(&store, "recent_flights_world.html", ListingVariant::World).await;
    assert_eq!(stats, IngestStats { inserted: 3, skipped: 0 });

    assert_eq!(store.pilots().await.len(), 3);
    assert_eq!(store.gliders().await.len(), 3);
    assert_eq!(store.takeoffs().await.len(), 3);

    let flights = store.flights().await;
    let ids: Vec<i64> = flights.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![4077839, 4078292, 4080147]);
    assert!(flights.iter().all(|f| f.takeoff_id.is_some()));
}

#[tokio::test]
async fn test_regional_page_shares_takeoff() {
    let store = Arc::new(MemoryStore::new());

    let stats = ingest(&store, "recent_flights_romania.html", ListingVariant::Regional).await;
    assert_eq!(stats.inserted, 3);

    // Two flights from Padureni, one from Daia Română
    let takeoffs = store.takeoffs().await;
    assert_eq!(takeoffs.len(), 2);

    let padureni = takeoffs.iter().find(|t| t.name == "Padureni").unwrap();
    let from_padureni = store
        .flights()
        .await
        .iter()
        .filter(|f| f.takeoff_id == Some(padureni.id))
        .count();
    assert_eq!(from_padureni, 2);

    // OZONE Rush 4 and 5 are distinct gliders, Zeolite the third
    assert_eq!(store.gliders().await.len(), 3);
}

#[tokio::test]
async fn test_reingest_is_noop() {
    let store = Arc::new(MemoryStore::new());

    ingest(&store, "recent_flights_world.html", ListingVariant::World).await;
    ingest(&store, "recent_flights_romania.html", ListingVariant::Regional).await;
    let pilots_before = store.pilots().await;
    let flights_before = store.flights().await;

    let again = ingest(&store, "recent_flights_world.html", ListingVariant::World).await;
    assert_eq!(again, IngestStats { inserted: 0, skipped: 3 });
    let again = ingest(&store, "recent_flights_romania.html", ListingVariant::Regional).await;
    assert_eq!(again, IngestStats { inserted: 0, skipped: 3 });

    assert_eq!(store.pilots().await, pilots_before);
    assert_eq!(store.flights().await, flights_before);
}

#[tokio::test]
async fn test_flight_keeps_scraped_values() {
    let store = Arc::new(MemoryStore::new());
    ingest(&store, "recent_flights_world.html", ListingVariant::World).await;

    let flight = store
        .flights()
        .await
        .into_iter()
        .find(|f| f.id == 4080147)
        .unwrap();
    let pilot = store
        .pilots()
        .await
        .into_iter()
        .find(|p| p.id == flight.pilot_id)
        .unwrap();
    let glider = store
        .gliders()
        .await
        .into_iter()
        .find(|g| g.id == flight.glider_id)
        .unwrap();

    assert_eq!(pilot.username, "flaviusionita");
    assert_eq!(glider.name, "ADVANCE Omega XAlps 3");
    assert_eq!(glider.category, "D");
    assert_eq!(flight.start_time.timestamp_millis(), 1691574120000);
    assert_eq!(flight.airtime_minutes, 402);
    assert_eq!(flight.category, "FAI triangle");
}

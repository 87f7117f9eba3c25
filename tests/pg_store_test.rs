mod common;

use chrono_tz::Europe::Bucharest;
use common::{TestDatabase, fixture};
use serial_test::serial;
use std::sync::Arc;
use xc2db::extractor::{ListingContext, ListingVariant, extract_flights};
use xc2db::geo::GeoPoint;
use xc2db::pg_store::PgStore;
use xc2db::pilots::NewPilot;
use xc2db::resolver::EntityResolver;
use xc2db::scrape_tasks::{NewScrapeTask, TaskCounts};
use xc2db::store::{FlightStore, StoreError, TaskLedger};
use xc2db::takeoffs::{NewTakeoff, UNKNOWN_TAKEOFF};

async fn setup_test_db() -> Option<TestDatabase> {
    let db = TestDatabase::new().await;
    if db.is_none() {
        eprintln!("TEST_DATABASE_URL not set, skipping");
    }
    db
}

#[tokio::test]
#[serial]
async fn test_duplicate_username_is_unique_violation() {
    let Some(test_db) = setup_test_db().await else {
        return;
    };
    let store = PgStore::new(test_db.pool());

    let pilot = NewPilot {
        name: "Daniel Filip".to_string(),
        username: "Danielfilip".to_string(),
    };
    let created = store.insert_pilot(&pilot).await.unwrap();
    assert!(created.id > 0);

    let err = store.insert_pilot(&pilot).await.unwrap_err();
    assert!(
        matches!(&err, StoreError::UniqueViolation(constraint) if constraint == "pilots_username_key"),
        "unexpected error: {err:?}"
    );

    let found = store.find_pilot_by_username("Danielfilip").await.unwrap();
    assert_eq!(found, Some(created));
}

#[tokio::test]
#[serial]
async fn test_takeoff_centroid_round_trip() {
    let Some(test_db) = setup_test_db().await else {
        return;
    };
    let store = PgStore::new(test_db.pool());

    let takeoff = NewTakeoff {
        name: "Daia Română".to_string(),
        centroid: GeoPoint::new(23.68482, 46.02835),
    };
    store.insert_takeoff(&takeoff).await.unwrap();

    let found = store.find_takeoff_by_name("Daia Română").await.unwrap().unwrap();
    assert_eq!(found.centroid, takeoff.centroid);
    assert!(store.find_takeoff_by_name("Padureni").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_ingest_world_page() {
    let Some(test_db) = setup_test_db().await else {
        return;
    };
    let store = Arc::new(PgStore::new(test_db.pool()));
    let ctx = ListingContext::new(ListingVariant::World, "ro", Bucharest);
    let flights = extract_flights(&fixture("recent_flights_world.html"), &ctx).unwrap();

    let mut resolver = EntityResolver::new(store.clone());
    let stats = resolver.ingest_page(&flights).await.unwrap();
    assert_eq!(stats.inserted, 3);
    assert_eq!(store.entity_counts().await.unwrap(), (3, 3, 3, 3));

    let stored = store.flights().get_flight_by_id(4080147).await.unwrap().unwrap();
    assert_eq!(stored.start_time, flights[0].start_time);
    assert_eq!(stored.start_point, flights[0].start_point);
    assert_eq!(stored.airtime_minutes, 402);

    let ids: Vec<i64> = flights.iter().map(|f| f.id).chain([1]).collect();
    let existing = store.existing_flight_ids(&ids).await.unwrap();
    assert_eq!(existing.len(), 3);
    assert!(!existing.contains(&1));

    // A fresh resolver has an empty cache but still finds everything stored
    let mut resolver = EntityResolver::new(store.clone());
    let again = resolver.ingest_page(&flights).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped, 3);
    assert_eq!(store.entity_counts().await.unwrap(), (3, 3, 3, 3));
}

#[tokio::test]
#[serial]
async fn test_unknown_takeoff_stored_as_null() {
    let Some(test_db) = setup_test_db().await else {
        return;
    };
    let store = Arc::new(PgStore::new(test_db.pool()));
    let ctx = ListingContext::new(ListingVariant::Regional, "ro", Bucharest);
    let mut flights = extract_flights(&fixture("recent_flights_romania.html"), &ctx).unwrap();
    flights.truncate(1);
    flights[0].takeoff.name = UNKNOWN_TAKEOFF.to_string();

    let mut resolver = EntityResolver::new(store.clone());
    resolver.ingest_page(&flights).await.unwrap();

    let stored = store.flights().get_flight_by_id(2343989).await.unwrap().unwrap();
    assert_eq!(stored.takeoff_id, None);
    assert_eq!(store.entity_counts().await.unwrap(), (1, 1, 0, 1));
}

#[tokio::test]
#[serial]
async fn test_task_ledger() {
    let Some(test_db) = setup_test_db().await else {
        return;
    };
    let store = PgStore::new(test_db.pool());
    let url = "https://www.xcontest.org/romania/zboruri/";

    let tasks = vec![
        NewScrapeTask::whole(url),
        NewScrapeTask::for_date(url, "2023-08-10"),
    ];
    assert_eq!(store.insert_tasks(&tasks).await.unwrap(), 2);
    assert_eq!(store.insert_tasks(&tasks).await.unwrap(), 0);
    assert_eq!(
        store.insert_tasks(&[NewScrapeTask::for_date(url, "2023-08-09")]).await.unwrap(),
        1
    );

    let pending = store.pending_tasks().await.unwrap();
    assert_eq!(pending.len(), 3);
    assert_eq!(pending[0].date_filter(), None);
    assert_eq!(pending[1].date_filter(), Some("2023-08-10"));

    assert!(store.mark_processed(pending[0].id).await.unwrap());
    assert!(!store.mark_processed(pending[0].id).await.unwrap());
    assert!(!store.mark_processed(-1).await.unwrap());

    assert_eq!(
        store.task_counts().await.unwrap(),
        TaskCounts {
            pending: 2,
            processed: 1
        }
    );
}

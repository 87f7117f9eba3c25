//! xc2db - scrapes XContest flight listings into PostgreSQL/PostGIS
//!
//! `populate` splits each configured listing into scrape tasks small enough to
//! page through, `scrape` works through the pending tasks and `recent` picks up
//! the newest flights without touching the task ledger.

pub mod crawl_config;
pub mod db;
pub mod delay;
pub mod extractor;
pub mod flights;
pub mod flights_repo;
pub mod gateway;
pub mod geo;
pub mod gliders;
pub mod gliders_repo;
pub mod log_format;
pub mod memory_store;
pub mod pg_store;
pub mod pilots;
pub mod pilots_repo;
pub mod recent;
pub mod resolver;
pub mod schema;
pub mod scheduler;
pub mod scrape_tasks;
pub mod scrape_tasks_repo;
pub mod store;
pub mod takeoffs;
pub mod takeoffs_repo;
pub mod worker;

pub use extractor::{ListingContext, ListingVariant, extract_flights};
pub use flights::ScrapedFlight;
pub use resolver::EntityResolver;
pub use store::{FlightStore, StoreError, TaskLedger};

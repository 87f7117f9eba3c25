use async_trait::async_trait;
use std::collections::HashSet;

use crate::db::PgPool;
use crate::flights::FlightRecord;
use crate::flights_repo::FlightsRepository;
use crate::gliders::{Glider, NewGlider};
use crate::gliders_repo::GlidersRepository;
use crate::pilots::{NewPilot, Pilot};
use crate::pilots_repo::PilotsRepository;
use crate::scrape_tasks::{NewScrapeTask, ScrapeTask, TaskCounts};
use crate::scrape_tasks_repo::ScrapeTasksRepository;
use crate::store::{FlightStore, StoreResult, TaskLedger};
use crate::takeoffs::{NewTakeoff, Takeoff};
use crate::takeoffs_repo::TakeoffsRepository;

/// PostgreSQL/PostGIS backed store, one repository per table
#[derive(Clone)]
pub struct PgStore {
    pilots: PilotsRepository,
    gliders: GlidersRepository,
    takeoffs: TakeoffsRepository,
    flights: FlightsRepository,
    tasks: ScrapeTasksRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pilots: PilotsRepository::new(pool.clone()),
            gliders: GlidersRepository::new(pool.clone()),
            takeoffs: TakeoffsRepository::new(pool.clone()),
            flights: FlightsRepository::new(pool.clone()),
            tasks: ScrapeTasksRepository::new(pool),
        }
    }

    pub fn flights(&self) -> &FlightsRepository {
        &self.flights
    }

    /// Row counts as (pilots, gliders, takeoffs, flights)
    pub async fn entity_counts(&self) -> StoreResult<(i64, i64, i64, i64)> {
        Ok((
            self.pilots.count().await?,
            self.gliders.count().await?,
            self.takeoffs.count().await?,
            self.flights.count().await?,
        ))
    }
}

#[async_trait]
impl FlightStore for PgStore {
    async fn find_pilot_by_username(&self, username: &str) -> StoreResult<Option<Pilot>> {
        Ok(self.pilots.find_by_username(username).await?)
    }

    async fn insert_pilot(&self, pilot: &NewPilot) -> StoreResult<Pilot> {
        Ok(self.pilots.insert(pilot).await?)
    }

    async fn find_glider_by_name(&self, name: &str) -> StoreResult<Option<Glider>> {
        Ok(self.gliders.find_by_name(name).await?)
    }

    async fn insert_glider(&self, glider: &NewGlider) -> StoreResult<Glider> {
        Ok(self.gliders.insert(glider).await?)
    }

    async fn find_takeoff_by_name(&self, name: &str) -> StoreResult<Option<Takeoff>> {
        Ok(self.takeoffs.find_by_name(name).await?)
    }

    async fn insert_takeoff(&self, takeoff: &NewTakeoff) -> StoreResult<Takeoff> {
        Ok(self.takeoffs.insert(takeoff).await?)
    }

    async fn existing_flight_ids(&self, ids: &[i64]) -> StoreResult<HashSet<i64>> {
        Ok(self.flights.find_existing_ids(ids).await?)
    }

    async fn insert_flight(&self, flight: &FlightRecord) -> StoreResult<()> {
        Ok(self.flights.insert_flight(flight).await?)
    }
}

#[async_trait]
impl TaskLedger for PgStore {
    async fn insert_tasks(&self, tasks: &[NewScrapeTask]) -> StoreResult<usize> {
        Ok(self.tasks.insert_tasks(tasks).await?)
    }

    async fn pending_tasks(&self) -> StoreResult<Vec<ScrapeTask>> {
        Ok(self.tasks.get_pending().await?)
    }

    async fn mark_processed(&self, task_id: i64) -> StoreResult<bool> {
        Ok(self.tasks.mark_processed(task_id).await?)
    }

    async fn task_counts(&self) -> StoreResult<TaskCounts> {
        Ok(self.tasks.counts().await?)
    }
}

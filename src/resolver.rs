use std::collections::{HashMap, HashSet};
use std::ops::AddAssign;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::flights::ScrapedFlight;
use crate::gliders::NewGlider;
use crate::pilots::NewPilot;
use crate::store::{FlightStore, StoreResult};
use crate::takeoffs::NewTakeoff;

/// Natural key -> row id for sub-entities already seen in this run
#[derive(Debug, Default)]
pub struct ResolverCache {
    pilots: HashMap<String, i64>,
    gliders: HashMap<String, i64>,
    takeoffs: HashMap<String, i64>,
}

impl ResolverCache {
    pub fn len(&self) -> usize {
        self.pilots.len() + self.gliders.len() + self.takeoffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub inserted: usize,
    /// Already stored, or repeated within the page
    pub skipped: usize,
}

impl AddAssign for IngestStats {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// Maps scraped flights onto stored pilots, gliders and takeoffs and inserts
/// the flights that aren't stored yet.
///
/// Sub-entities are looked up by natural key and created on a miss. A create
/// that loses a race against another writer comes back as a unique violation;
/// the row is then read back instead.
pub struct EntityResolver {
    store: Arc<dyn FlightStore>,
    cache: ResolverCache,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn FlightStore>) -> Self {
        Self {
            store,
            cache: ResolverCache::default(),
        }
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Persist one page worth of flights. Known flight ids are filtered out
    /// with a single existence query up front.
    pub async fn ingest_page(&mut self, flights: &[ScrapedFlight]) -> StoreResult<IngestStats> {
        let mut stats = IngestStats::default();
        if flights.is_empty() {
            return Ok(stats);
        }

        let ids: Vec<i64> = flights.iter().map(|f| f.id).collect();
        let existing = self.store.existing_flight_ids(&ids).await?;
        let mut seen = HashSet::with_capacity(flights.len());

        for flight in flights {
            if existing.contains(&flight.id) || !seen.insert(flight.id) {
                stats.skipped += 1;
                continue;
            }

            let pilot_id = self.resolve_pilot(&flight.pilot).await?;
            let takeoff_id = self.resolve_takeoff(&flight.takeoff).await?;
            let glider_id = self.resolve_glider(&flight.glider).await?;

            let record = flight.to_record(pilot_id, takeoff_id, glider_id);
            match self.store.insert_flight(&record).await {
                Ok(()) => {
                    trace!(flight_id = flight.id, "Inserted flight");
                    stats.inserted += 1;
                }
                Err(e) if e.is_unique_violation() => {
                    debug!(flight_id = flight.id, "Flight stored concurrently, skipping");
                    stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        metrics::counter!("xc2db.flights.inserted_total").increment(stats.inserted as u64);
        metrics::counter!("xc2db.flights.skipped_total").increment(stats.skipped as u64);
        Ok(stats)
    }

    async fn resolve_pilot(&mut self, pilot: &NewPilot) -> StoreResult<i64> {
        if let Some(id) = self.cache.pilots.get(&pilot.username) {
            return Ok(*id);
        }

        let id = match self.store.find_pilot_by_username(&pilot.username).await? {
            Some(found) => found.id,
            None => match self.store.insert_pilot(pilot).await {
                Ok(created) => {
                    metrics::counter!("xc2db.pilots.created_total").increment(1);
                    created.id
                }
                Err(e) if e.is_unique_violation() => {
                    self.store
                        .find_pilot_by_username(&pilot.username)
                        .await?
                        .ok_or(e)?
                        .id
                }
                Err(e) => return Err(e),
            },
        };

        self.cache.pilots.insert(pilot.username.clone(), id);
        Ok(id)
    }

    /// `None` for the site's unknown-takeoff marker
    async fn resolve_takeoff(&mut self, takeoff: &NewTakeoff) -> StoreResult<Option<i64>> {
        if takeoff.is_unknown() {
            return Ok(None);
        }
        if let Some(id) = self.cache.takeoffs.get(&takeoff.name) {
            return Ok(Some(*id));
        }

        let id = match self.store.find_takeoff_by_name(&takeoff.name).await? {
            Some(found) => found.id,
            None => match self.store.insert_takeoff(takeoff).await {
                Ok(created) => {
                    metrics::counter!("xc2db.takeoffs.created_total").increment(1);
                    created.id
                }
                Err(e) if e.is_unique_violation() => {
                    self.store
                        .find_takeoff_by_name(&takeoff.name)
                        .await?
                        .ok_or(e)?
                        .id
                }
                Err(e) => return Err(e),
            },
        };

        self.cache.takeoffs.insert(takeoff.name.clone(), id);
        Ok(Some(id))
    }

    async fn resolve_glider(&mut self, glider: &NewGlider) -> StoreResult<i64> {
        if let Some(id) = self.cache.gliders.get(&glider.name) {
            return Ok(*id);
        }

        let id = match self.store.find_glider_by_name(&glider.name).await? {
            Some(found) => found.id,
            None => match self.store.insert_glider(glider).await {
                Ok(created) => {
                    metrics::counter!("xc2db.gliders.created_total").increment(1);
                    created.id
                }
                Err(e) if e.is_unique_violation() => {
                    self.store
                        .find_glider_by_name(&glider.name)
                        .await?
                        .ok_or(e)?
                        .id
                }
                Err(e) => return Err(e),
            },
        };

        self.cache.gliders.insert(glider.name.clone(), id);
        Ok(id)
    }
}

//! In-process store with the same uniqueness rules as the database schema.
//! Backs `recent --dry-run` and the integration tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::flights::FlightRecord;
use crate::gliders::{Glider, NewGlider};
use crate::pilots::{NewPilot, Pilot};
use crate::scrape_tasks::{NewScrapeTask, ScrapeTask, TaskCounts};
use crate::store::{FlightStore, StoreError, StoreResult, TaskLedger};
use crate::takeoffs::{NewTakeoff, Takeoff};

#[derive(Default)]
struct Tables {
    pilots: HashMap<String, Pilot>,
    gliders: HashMap<String, Glider>,
    takeoffs: HashMap<String, Takeoff>,
    flights: HashMap<i64, FlightRecord>,
    tasks: Vec<ScrapeTask>,
    next_id: i64,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pilots(&self) -> Vec<Pilot> {
        let tables = self.tables.lock().await;
        let mut pilots: Vec<Pilot> = tables.pilots.values().cloned().collect();
        pilots.sort_by_key(|p| p.id);
        pilots
    }

    pub async fn gliders(&self) -> Vec<Glider> {
        let tables = self.tables.lock().await;
        let mut gliders: Vec<Glider> = tables.gliders.values().cloned().collect();
        gliders.sort_by_key(|g| g.id);
        gliders
    }

    pub async fn takeoffs(&self) -> Vec<Takeoff> {
        let tables = self.tables.lock().await;
        let mut takeoffs: Vec<Takeoff> = tables.takeoffs.values().cloned().collect();
        takeoffs.sort_by_key(|t| t.id);
        takeoffs
    }

    /// Stored flights ordered by id
    pub async fn flights(&self) -> Vec<FlightRecord> {
        let tables = self.tables.lock().await;
        let mut flights: Vec<FlightRecord> = tables.flights.values().cloned().collect();
        flights.sort_by_key(|f| f.id);
        flights
    }

    pub async fn tasks(&self) -> Vec<ScrapeTask> {
        self.tables.lock().await.tasks.clone()
    }
}

#[async_trait]
impl FlightStore for MemoryStore {
    async fn find_pilot_by_username(&self, username: &str) -> StoreResult<Option<Pilot>> {
        Ok(self.tables.lock().await.pilots.get(username).cloned())
    }

    async fn insert_pilot(&self, pilot: &NewPilot) -> StoreResult<Pilot> {
        let mut tables = self.tables.lock().await;
        if tables.pilots.contains_key(&pilot.username) {
            return Err(StoreError::UniqueViolation("pilots_username_key".into()));
        }
        let row = Pilot {
            id: tables.allocate_id(),
            name: pilot.name.clone(),
            username: pilot.username.clone(),
        };
        tables.pilots.insert(row.username.clone(), row.clone());
        Ok(row)
    }

    async fn find_glider_by_name(&self, name: &str) -> StoreResult<Option<Glider>> {
        Ok(self.tables.lock().await.gliders.get(name).cloned())
    }

    async fn insert_glider(&self, glider: &NewGlider) -> StoreResult<Glider> {
        let mut tables = self.tables.lock().await;
        if tables.gliders.contains_key(&glider.name) {
            return Err(StoreError::UniqueViolation("gliders_name_key".into()));
        }
        let row = Glider {
            id: tables.allocate_id(),
            name: glider.name.clone(),
            category: glider.category.clone(),
        };
        tables.gliders.insert(row.name.clone(), row.clone());
        Ok(row)
    }

    async fn find_takeoff_by_name(&self, name: &str) -> StoreResult<Option<Takeoff>> {
        Ok(self.tables.lock().await.takeoffs.get(name).cloned())
    }

    async fn insert_takeoff(&self, takeoff: &NewTakeoff) -> StoreResult<Takeoff> {
        let mut tables = self.tables.lock().await;
        if tables.takeoffs.contains_key(&takeoff.name) {
            return Err(StoreError::UniqueViolation("takeoffs_name_key".into()));
        }
        let row = Takeoff {
            id: tables.allocate_id(),
            name: takeoff.name.clone(),
            centroid: takeoff.centroid,
        };
        tables.takeoffs.insert(row.name.clone(), row.clone());
        Ok(row)
    }

    async fn existing_flight_ids(&self, ids: &[i64]) -> StoreResult<HashSet<i64>> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.flights.contains_key(id))
            .collect())
    }

    async fn insert_flight(&self, flight: &FlightRecord) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.flights.contains_key(&flight.id) {
            return Err(StoreError::UniqueViolation("flights_pkey".into()));
        }
        tables.flights.insert(flight.id, flight.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskLedger for MemoryStore {
    async fn insert_tasks(&self, tasks: &[NewScrapeTask]) -> StoreResult<usize> {
        let mut tables = self.tables.lock().await;
        let mut created = 0;
        for task in tasks {
            let exists = tables
                .tasks
                .iter()
                .any(|t| t.url == task.url && t.date == task.date);
            if exists {
                continue;
            }
            let now = Utc::now();
            let id = tables.allocate_id();
            tables.tasks.push(ScrapeTask {
                id,
                url: task.url.clone(),
                date: task.date.clone(),
                processed: false,
                created_at: now,
                updated_at: now,
            });
            created += 1;
        }
        Ok(created)
    }

    async fn pending_tasks(&self) -> StoreResult<Vec<ScrapeTask>> {
        let tables = self.tables.lock().await;
        Ok(tables.tasks.iter().filter(|t| !t.processed).cloned().collect())
    }

    async fn mark_processed(&self, task_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && !t.processed)
        {
            Some(task) => {
                task.processed = true;
                task.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn task_counts(&self) -> StoreResult<TaskCounts> {
        let tables = self.tables.lock().await;
        let processed = tables.tasks.iter().filter(|t| t.processed).count() as i64;
        Ok(TaskCounts {
            pending: tables.tasks.len() as i64 - processed,
            processed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_pilot_is_unique_violation() {
        let store = MemoryStore::new();
        let pilot = NewPilot {
            name: "Daniel Filip".to_string(),
            username: "Danielfilip".to_string(),
        };
        store.insert_pilot(&pilot).await.unwrap();
        let err = store.insert_pilot(&pilot).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_task_ledger_is_idempotent_and_one_way() {
        let store = MemoryStore::new();
        let tasks = vec![
            NewScrapeTask::for_date("https://example.test/list", "2023-08-10"),
            NewScrapeTask::for_date("https://example.test/list", "2023-08-09"),
        ];
        assert_eq!(store.insert_tasks(&tasks).await.unwrap(), 2);
        assert_eq!(store.insert_tasks(&tasks).await.unwrap(), 0);

        let pending = store.pending_tasks().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(store.mark_processed(pending[0].id).await.unwrap());
        assert!(!store.mark_processed(pending[0].id).await.unwrap());

        let counts = store.task_counts().await.unwrap();
        assert_eq!(counts, TaskCounts { pending: 1, processed: 1 });
    }
}

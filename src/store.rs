//! Persistence contract used by the resolver, scheduler and worker.
//!
//! Sub-entities are resolved with an explicit `find_*` / `insert_*` pair rather
//! than an atomic upsert. An insert that hits a unique constraint surfaces as
//! [`StoreError::UniqueViolation`]; callers treat it as "row already exists"
//! and read it back.

use async_trait::async_trait;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashSet;
use thiserror::Error;

use crate::flights::FlightRecord;
use crate::gliders::{Glider, NewGlider};
use crate::pilots::{NewPilot, Pilot};
use crate::scrape_tasks::{NewScrapeTask, ScrapeTask, TaskCounts};
use crate::takeoffs::{NewTakeoff, Takeoff};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Database(anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) =
            err.downcast_ref::<DieselError>()
        {
            let constraint = info.constraint_name().unwrap_or("unknown").to_string();
            return StoreError::UniqueViolation(constraint);
        }
        StoreError::Database(err)
    }
}

/// Flights and their normalized sub-entities
#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn find_pilot_by_username(&self, username: &str) -> StoreResult<Option<Pilot>>;
    async fn insert_pilot(&self, pilot: &NewPilot) -> StoreResult<Pilot>;

    async fn find_glider_by_name(&self, name: &str) -> StoreResult<Option<Glider>>;
    async fn insert_glider(&self, glider: &NewGlider) -> StoreResult<Glider>;

    async fn find_takeoff_by_name(&self, name: &str) -> StoreResult<Option<Takeoff>>;
    async fn insert_takeoff(&self, takeoff: &NewTakeoff) -> StoreResult<Takeoff>;

    /// Subset of `ids` already stored
    async fn existing_flight_ids(&self, ids: &[i64]) -> StoreResult<HashSet<i64>>;
    async fn insert_flight(&self, flight: &FlightRecord) -> StoreResult<()>;
}

/// The scrape-task ledger shared by `populate` and `scrape`
#[async_trait]
pub trait TaskLedger: Send + Sync {
    /// Inserts tasks, ignoring (url, date) pairs already present; returns the
    /// number of rows created
    async fn insert_tasks(&self, tasks: &[NewScrapeTask]) -> StoreResult<usize>;
    async fn pending_tasks(&self) -> StoreResult<Vec<ScrapeTask>>;
    /// Returns false if the task was unknown or already processed
    async fn mark_processed(&self, task_id: i64) -> StoreResult<bool>;
    async fn task_counts(&self) -> StoreResult<TaskCounts>;
}

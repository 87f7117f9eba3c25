use anyhow::Result;
use diesel::prelude::*;
use std::collections::HashSet;

use crate::db::PgPool;
use crate::flights::{FlightModel, FlightRecord, NewFlightModel};

#[derive(Clone)]
pub struct FlightsRepository {
    pool: PgPool,
}

impl FlightsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new flight into the database
    pub async fn insert_flight(&self, flight: &FlightRecord) -> Result<()> {
        use crate::schema::flights;

        let pool = self.pool.clone();
        let flight_model: NewFlightModel = flight.into();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::insert_into(flights::table)
                .values(&flight_model)
                .execute(&mut conn)?;

            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Return which of the given flight ids are already stored, in one query
    pub async fn find_existing_ids(&self, ids: &[i64]) -> Result<HashSet<i64>> {
        use crate::schema::flights::dsl::*;

        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let pool = self.pool.clone();
        let ids = ids.to_vec();

        let existing = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let found: Vec<i64> = flights
                .filter(id.eq_any(&ids))
                .select(id)
                .load(&mut conn)?;

            Ok::<Vec<i64>, anyhow::Error>(found)
        })
        .await??;

        Ok(existing.into_iter().collect())
    }

    /// Get a flight by its site id
    pub async fn get_flight_by_id(&self, flight_id: i64) -> Result<Option<FlightRecord>> {
        use crate::schema::flights::dsl::*;

        let pool = self.pool.clone();

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let flight_model: Option<FlightModel> = flights
                .filter(id.eq(flight_id))
                .select(FlightModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<FlightModel>, anyhow::Error>(flight_model)
        })
        .await??;

        Ok(result.map(|model| model.into()))
    }

    pub async fn count(&self) -> Result<i64> {
        use crate::schema::flights::dsl::*;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = flights.count().get_result::<i64>(&mut conn)?;
            Ok::<i64, anyhow::Error>(total)
        })
        .await??;

        Ok(result)
    }
}

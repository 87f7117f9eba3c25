use anyhow::Result;
use diesel::prelude::*;

use crate::db::PgPool;
use crate::pilots::{NewPilot, Pilot, PilotModel};

#[derive(Clone)]
pub struct PilotsRepository {
    pool: PgPool,
}

impl PilotsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a pilot by username
    pub async fn find_by_username(&self, username_val: &str) -> Result<Option<Pilot>> {
        use crate::schema::pilots::dsl::*;

        let pool = self.pool.clone();
        let username_val = username_val.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let pilot_model: Option<PilotModel> = pilots
                .filter(username.eq(&username_val))
                .select(PilotModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<PilotModel>, anyhow::Error>(pilot_model)
        })
        .await??;

        Ok(result.map(Pilot::from))
    }

    /// Insert a pilot. Fails with a unique violation if the username exists.
    pub async fn insert(&self, pilot: &NewPilot) -> Result<Pilot> {
        use crate::schema::pilots;

        let pool = self.pool.clone();
        let pilot = pilot.clone();

        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let model: PilotModel = diesel::insert_into(pilots::table)
                .values(&pilot)
                .returning(PilotModel::as_returning())
                .get_result(&mut conn)?;

            Ok::<PilotModel, anyhow::Error>(model)
        })
        .await??;

        Ok(inserted.into())
    }

    pub async fn count(&self) -> Result<i64> {
        use crate::schema::pilots::dsl::*;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = pilots.count().get_result::<i64>(&mut conn)?;
            Ok::<i64, anyhow::Error>(total)
        })
        .await??;

        Ok(result)
    }
}

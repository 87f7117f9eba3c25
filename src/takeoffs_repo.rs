use anyhow::Result;
use diesel::prelude::*;

use crate::db::PgPool;
use crate::takeoffs::{NewTakeoff, NewTakeoffModel, Takeoff, TakeoffModel};

#[derive(Clone)]
pub struct TakeoffsRepository {
    pool: PgPool,
}

impl TakeoffsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name_val: &str) -> Result<Option<Takeoff>> {
        use crate::schema::takeoffs::dsl::*;

        let pool = self.pool.clone();
        let name_val = name_val.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let takeoff_model: Option<TakeoffModel> = takeoffs
                .filter(name.eq(&name_val))
                .select(TakeoffModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<TakeoffModel>, anyhow::Error>(takeoff_model)
        })
        .await??;

        Ok(result.map(Takeoff::from))
    }

    /// Insert a takeoff; the centroid is stored as a geography point
    pub async fn insert(&self, takeoff: &NewTakeoff) -> Result<Takeoff> {
        use crate::schema::takeoffs;

        let pool = self.pool.clone();
        let new_model: NewTakeoffModel = takeoff.into();

        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let model: TakeoffModel = diesel::insert_into(takeoffs::table)
                .values(&new_model)
                .returning(TakeoffModel::as_returning())
                .get_result(&mut conn)?;

            Ok::<TakeoffModel, anyhow::Error>(model)
        })
        .await??;

        Ok(inserted.into())
    }

    pub async fn count(&self) -> Result<i64> {
        use crate::schema::takeoffs::dsl::*;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = takeoffs.count().get_result::<i64>(&mut conn)?;
            Ok::<i64, anyhow::Error>(total)
        })
        .await??;

        Ok(result)
    }
}

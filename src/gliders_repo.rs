use anyhow::Result;
use diesel::prelude::*;

use crate::db::PgPool;
use crate::gliders::{Glider, GliderModel, NewGlider};

#[derive(Clone)]
pub struct GlidersRepository {
    pool: PgPool,
}

impl GlidersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name_val: &str) -> Result<Option<Glider>> {
        use crate::schema::gliders::dsl::*;

        let pool = self.pool.clone();
        let name_val = name_val.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let glider_model: Option<GliderModel> = gliders
                .filter(name.eq(&name_val))
                .select(GliderModel::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<GliderModel>, anyhow::Error>(glider_model)
        })
        .await??;

        Ok(result.map(Glider::from))
    }

    pub async fn insert(&self, glider: &NewGlider) -> Result<Glider> {
        use crate::schema::gliders;

        let pool = self.pool.clone();
        let glider = glider.clone();

        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let model: GliderModel = diesel::insert_into(gliders::table)
                .values(&glider)
                .returning(GliderModel::as_returning())
                .get_result(&mut conn)?;

            Ok::<GliderModel, anyhow::Error>(model)
        })
        .await??;

        Ok(inserted.into())
    }

    pub async fn count(&self) -> Result<i64> {
        use crate::schema::gliders::dsl::*;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = gliders.count().get_result::<i64>(&mut conn)?;
            Ok::<i64, anyhow::Error>(total)
        })
        .await??;

        Ok(result)
    }
}

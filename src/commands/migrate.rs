use anyhow::{Context, Result};
use std::env;
use tracing::info;

use xc2db::db;

pub async fn handle_migrate() -> Result<()> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::create_pool(&database_url)?;

    let applied = db::run_migrations(&pool).await?;
    if applied == 0 {
        info!("Database schema is up to date");
    }
    Ok(())
}

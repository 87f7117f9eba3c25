use anyhow::{Context, Result};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

// Embed migrations at compile time
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

/// Build the connection pool. The crawl is sequential, so a handful of
/// connections is plenty.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(4)
        .build(manager)
        .context("Failed to create database connection pool")
}

/// Apply pending migrations, returning how many were applied
pub async fn run_migrations(pool: &PgPool) -> Result<usize> {
    let pool = pool.clone();

    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
        Ok::<usize, anyhow::Error>(applied.len())
    })
    .await??;

    if applied > 0 {
        info!("Applied {} database migration(s)", applied);
    }
    Ok(applied)
}

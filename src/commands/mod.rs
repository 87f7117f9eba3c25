pub mod migrate;
pub mod populate;
pub mod recent;
pub mod scrape;

pub use migrate::handle_migrate;
pub use populate::handle_populate;
pub use recent::handle_recent;
pub use scrape::handle_scrape;

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::info;

use xc2db::db::{self, PgPool};
use xc2db::gateway::{BrowserlessGateway, ProxySelector};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";

/// Pool for `DATABASE_URL` with migrations applied
pub async fn connect_database() -> Result<PgPool> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::create_pool(&database_url)?;
    db::run_migrations(&pool)
        .await
        .context("Failed to apply database migrations")?;
    Ok(pool)
}

/// Rendering service client for `GATEWAY_URL`, checked with a health probe.
/// A failed probe means there is no usable network path and the run stops.
pub async fn connect_gateway() -> Result<Arc<BrowserlessGateway>> {
    let base_url = env::var("GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
    let proxies = env::var("GATEWAY_PROXY")
        .map(|list| ProxySelector::parse(&list))
        .unwrap_or_default();
    if !proxies.is_empty() {
        info!("Routing renders through GATEWAY_PROXY");
    }

    let gateway = BrowserlessGateway::new(&base_url, proxies)
        .context("Failed to build rendering service client")?;
    gateway
        .health()
        .await
        .with_context(|| format!("No usable network path via {}", gateway.base_url()))?;
    info!("Rendering service at {} is healthy", gateway.base_url());

    Ok(Arc::new(gateway))
}

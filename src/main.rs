use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use xc2db::crawl_config::{CrawlConfigFile, listing_timezone};
use xc2db::log_format::TargetFirstFormat;

mod commands;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(name = "xc2db")]
#[command(about = "Scrape XContest flight listings into PostgreSQL/PostGIS")]
#[command(version)]
struct Cli {
    /// Crawler config file (defaults to ./xc2db.toml when present)
    #[arg(long, global = true, env = "XC2DB_CONFIG")]
    config: Option<PathBuf>,

    /// Leave timestamps off log lines (for journald and the like)
    #[arg(long, global = true, env = "XC2DB_NO_LOG_TIMESTAMPS")]
    no_log_timestamps: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the configured listings into scrape tasks
    Populate,
    /// Work through all pending scrape tasks
    Scrape,
    /// Ingest the newest page of each listing, bypassing the task ledger
    Recent {
        /// Resolve against an in-memory store and only report counts
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply database migrations and exit
    Migrate,
}

fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

fn init_tracing(timestamps: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = if timestamps {
        TargetFirstFormat::new()
    } else {
        TargetFirstFormat::without_timestamps()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().event_format(format))
        .with(sentry_tracing::layer())
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Migrate = cli.command {
        return commands::handle_migrate().await;
    }

    let config = CrawlConfigFile::load_or_default(cli.config.as_deref())?;
    let tz = listing_timezone()?;

    match cli.command {
        Commands::Populate => commands::handle_populate(config).await,
        Commands::Scrape => commands::handle_scrape(config, tz).await,
        Commands::Recent { dry_run } => commands::handle_recent(config, tz, dry_run).await,
        Commands::Migrate => commands::handle_migrate().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _sentry = init_sentry();
    init_tracing(!cli.no_log_timestamps);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

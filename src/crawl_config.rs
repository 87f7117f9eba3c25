use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::delay::RandomDelay;
use crate::extractor::ListingVariant;
use crate::gateway::RenderRequest;

pub const DEFAULT_TIMEZONE: &str = "Europe/Bucharest";

/// Site-wide listing narrowed to Romanian flights, newest registrations first
pub const WORLD_RECENT_URL: &str =
    "https://www.xcontest.org/world/en/flights/#filter[country]=RO@flights[sort]=reg";
/// The national listing
pub const REGIONAL_RECENT_URL: &str = "https://www.xcontest.org/romania/zboruri/";

/// A listing to crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTarget {
    pub url: String,
    /// Guessed from the URL when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ListingVariant>,
}

impl CrawlTarget {
    pub fn new(url: &str, variant: ListingVariant) -> Self {
        Self {
            url: url.to_string(),
            variant: Some(variant),
        }
    }

    pub fn variant(&self) -> ListingVariant {
        self.variant
            .unwrap_or_else(|| ListingVariant::from_url(&self.url))
    }
}

/// Seconds, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    pub fn policy(&self) -> RandomDelay {
        RandomDelay::from_secs(self.min_secs, self.max_secs)
    }
}

/// Top-level crawler configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfigFile {
    /// Country code whose takeoffs are kept from world listings
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Selector the renderer waits for before returning the page
    #[serde(default = "default_wait_for_selector")]
    pub wait_for_selector: Option<String>,
    #[serde(default = "default_page_delay")]
    pub page_delay: DelayRange,
    #[serde(default = "default_task_delay")]
    pub task_delay: DelayRange,
    /// Backoff between attempts to read the date filter
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: DelayRange,
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Listings split into tasks by `populate`
    #[serde(default = "default_targets")]
    pub targets: Vec<CrawlTarget>,
    /// Newest-first views read by `recent`
    #[serde(default = "default_recent_targets")]
    pub recent_targets: Vec<CrawlTarget>,
}

fn default_region() -> String {
    "ro".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_wait_for_selector() -> Option<String> {
    Some("#flights".to_string())
}

fn default_page_delay() -> DelayRange {
    DelayRange {
        min_secs: 5,
        max_secs: 15,
    }
}

fn default_task_delay() -> DelayRange {
    DelayRange {
        min_secs: 30,
        max_secs: 90,
    }
}

fn default_retry_backoff() -> DelayRange {
    DelayRange {
        min_secs: 60,
        max_secs: 300,
    }
}

fn default_retry_budget() -> u32 {
    5
}

fn default_targets() -> Vec<CrawlTarget> {
    vec![
        CrawlTarget::new(WORLD_RECENT_URL, ListingVariant::World),
        CrawlTarget::new(REGIONAL_RECENT_URL, ListingVariant::Regional),
    ]
}

fn default_recent_targets() -> Vec<CrawlTarget> {
    default_targets()
}

impl Default for CrawlConfigFile {
    fn default() -> Self {
        Self {
            region: default_region(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            wait_for_selector: default_wait_for_selector(),
            page_delay: default_page_delay(),
            task_delay: default_task_delay(),
            retry_backoff: default_retry_backoff(),
            retry_budget: default_retry_budget(),
            targets: default_targets(),
            recent_targets: default_recent_targets(),
        }
    }
}

impl CrawlConfigFile {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: CrawlConfigFile =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        if config.retry_budget == 0 {
            return Err(anyhow!("retry_budget in {:?} must be at least 1", path));
        }
        Ok(config)
    }

    /// Explicit path must exist; otherwise the default location is used if
    /// present and the built-in settings if not
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = crawl_config_path();
        if default_path.exists() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn render_request(&self, url: &str) -> RenderRequest {
        let request = RenderRequest::new(url, self.fetch_timeout());
        match &self.wait_for_selector {
            Some(selector) => request.wait_for(selector.as_str()),
            None => request,
        }
    }

    /// The configured variant of `url`, or a guess from the URL itself
    pub fn variant_for(&self, url: &str) -> ListingVariant {
        self.targets
            .iter()
            .chain(&self.recent_targets)
            .find(|t| t.url == url)
            .map(CrawlTarget::variant)
            .unwrap_or_else(|| ListingVariant::from_url(url))
    }
}

/// Resolve the crawler config file path.
///
/// Priority:
/// 1. `XC2DB_CONFIG` env var
/// 2. `./xc2db.toml`
pub fn crawl_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("XC2DB_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("./xc2db.toml")
}

/// Zone the site shows start times in; `TZ` overrides the default
pub fn listing_timezone() -> Result<Tz> {
    let name = std::env::var("TZ")
        .ok()
        .filter(|tz| !tz.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    parse_timezone(&name)
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("Invalid time zone {:?}: {}", name, e))
}

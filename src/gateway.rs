//! Client for the headless-browser rendering service.
//!
//! The service takes `POST /content` with a JSON render request and answers
//! with the rendered HTML. `GET /health` reports whether it can still reach
//! the outside world.

use async_trait::async_trait;
use rand::RngExt;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Added on top of the render timeout so the service gets to report its own
/// timeout before the HTTP client gives up
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service itself can't be reached or says it has no working browser
    #[error("rendering service unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("rendering service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl GatewayError {
    /// No usable network path; the whole run should stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            GatewayError::Unavailable(err.to_string())
        } else {
            GatewayError::Network(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// One page render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub url: String,
    /// CSS selector the page must show before its HTML is captured
    pub wait_for_selector: Option<String>,
    pub timeout: Duration,
    /// `http://host:port` proxy for this render only
    pub proxy: Option<String>,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            wait_for_selector: None,
            timeout,
            proxy: None,
        }
    }

    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    pub fn via_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    fn body(&self) -> ContentBody<'_> {
        ContentBody {
            url: &self.url,
            wait_for_selector: self.wait_for_selector.as_deref(),
            goto_options: GotoOptions {
                timeout: self.timeout.as_millis() as u64,
            },
            proxy: self.proxy.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentBody<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_selector: Option<&'a str>,
    goto_options: GotoOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct GotoOptions {
    timeout: u64,
}

/// Anything that can turn a listing URL into rendered HTML
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, request: &RenderRequest) -> Result<String>;
}

/// Picks a proxy per request from a fixed list
#[derive(Debug, Clone, Default)]
pub struct ProxySelector {
    proxies: Vec<String>,
}

impl ProxySelector {
    /// Comma or whitespace separated `http://host:port` entries
    pub fn parse(list: &str) -> Self {
        let proxies = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self { proxies }
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn pick(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..self.proxies.len());
        Some(self.proxies[index].clone())
    }
}

pub struct BrowserlessGateway {
    client: reqwest::Client,
    base_url: String,
    proxies: ProxySelector,
}

impl BrowserlessGateway {
    pub fn new(base_url: &str, proxies: ProxySelector) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            proxies,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET /health`. Anything but a 2xx means there is no usable
    /// network path.
    pub async fn health(&self) -> Result<()> {
        let endpoint = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&endpoint)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "Rendering service health check failed");
            return Err(GatewayError::Unavailable(format!(
                "health check returned HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentFetcher for BrowserlessGateway {
    async fn fetch(&self, request: &RenderRequest) -> Result<String> {
        let endpoint = format!("{}/content", self.base_url);

        let mut request = request.clone();
        if request.proxy.is_none() {
            request.proxy = self.proxies.pick();
        }
        debug!(url = %request.url, proxy = ?request.proxy, "Rendering page");

        let resp = self
            .client
            .post(&endpoint)
            .timeout(request.timeout + CLIENT_TIMEOUT_MARGIN)
            .json(&request.body())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

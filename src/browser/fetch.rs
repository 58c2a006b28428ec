//! Fetching destination page markup

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::navigation::NavigationError;
use crate::util::lock;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` sending `capability` as the capability header; the body of a
    /// successful response
    async fn fetch(&self, url: &Url, capability: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    http_client: reqwest::Client,
    header_name: String,
}

impl HttpPageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            header_name: config.capability_header.clone(),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url, capability: &str) -> Result<String> {
        debug!("GET {} ({}: {})", url, self.header_name, capability);
        let response = self
            .http_client
            .get(url.clone())
            .header(self.header_name.as_str(), capability)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavigationError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

/// Serves pages from memory and records every request
#[derive(Clone, Default)]
pub struct StaticFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    delay: Option<Duration>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, markup: impl Into<String>) -> Self {
        self.insert(url, markup);
        self
    }

    /// Delay every response, keeping a navigation in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, url: &str, markup: impl Into<String>) {
        lock(&self.pages).insert(normalize(url), markup.into());
    }

    /// `(url, capability header)` pairs in request order
    pub fn requests(&self) -> Vec<(String, String)> {
        lock(&self.requests).clone()
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url, capability: &str) -> Result<String> {
        lock(&self.requests).push((url.to_string(), capability.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut key = url.clone();
        key.set_fragment(None);
        lock(&self.pages).get(key.as_str()).cloned().ok_or_else(|| {
            NavigationError::FetchStatus {
                url: url.to_string(),
                status: 404,
            }
            .into()
        })
    }
}

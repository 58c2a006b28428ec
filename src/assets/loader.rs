//! Asset insertion backends
//!
//! An [`AssetLoader`] performs the single underlying network/insertion
//! operation for one descriptor. [`AssetCache`](super::AssetCache) decides
//! when that happens.

use async_trait::async_trait;
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use super::{AssetDescriptor, AssetError, AssetKind, AssetNode};
use crate::util::lock;

#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Fetch (or take the inline payload of) the asset and insert it
    async fn insert(&self, descriptor: &AssetDescriptor) -> Result<AssetNode, AssetError>;

    /// Whether an inserted stylesheet's rules can be queried yet
    fn rules_ready(&self, _node: &AssetNode) -> bool {
        true
    }
}

/// Nodes inserted into the document head, in insertion order
#[derive(Debug, Clone, Default)]
pub struct AssetHead {
    nodes: Arc<Mutex<Vec<Arc<AssetNode>>>>,
}

impl AssetHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, node: AssetNode) {
        lock(&self.nodes).push(Arc::new(node));
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.nodes).iter().any(|node| node.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        lock(&self.nodes).iter().map(|node| node.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.nodes).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads assets over HTTP with reqwest and records them in an [`AssetHead`]
pub struct HttpAssetLoader {
    http_client: reqwest::Client,
    base_url: Option<Url>,
    head: AssetHead,
}

impl HttpAssetLoader {
    pub fn new(http_client: reqwest::Client, head: AssetHead) -> Self {
        Self {
            http_client,
            base_url: None,
            head,
        }
    }

    /// Resolve relative sources against `base_url`
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn head(&self) -> &AssetHead {
        &self.head
    }

    fn resolve(&self, id: &str, src: &str) -> Result<Url, AssetError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(src),
            None => Url::parse(src),
        };
        parsed.map_err(|e| AssetError::Network {
            id: id.to_string(),
            reason: format!("invalid source '{}': {}", src, e),
        })
    }

    async fn download(&self, id: &str, src: &str) -> Result<String, AssetError> {
        let url = self.resolve(id, src)?;
        let network = |e: reqwest::Error| AssetError::Network {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let response = self.http_client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                id: id.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(network)
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn insert(&self, descriptor: &AssetDescriptor) -> Result<AssetNode, AssetError> {
        let content = match (&descriptor.inline, &descriptor.src) {
            (Some(inline), _) => inline.clone(),
            (None, Some(src)) => self.download(&descriptor.id, src).await?,
            (None, None) => {
                return Err(AssetError::MissingSource {
                    id: descriptor.id.clone(),
                });
            }
        };

        let node = AssetNode {
            id: descriptor.id.clone(),
            kind: descriptor.kind,
            source: descriptor.src.clone(),
            content,
        };
        debug!("Inserted {:?} asset '{}' into head", node.kind, node.id);
        self.head.record(node.clone());
        Ok(node)
    }

    fn rules_ready(&self, node: &AssetNode) -> bool {
        node.kind != AssetKind::Style || self.head.contains(&node.id)
    }
}

/// Build the HTTP client used for asset downloads
pub fn http_client(user_agent: &str, timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_payload_skips_network() {
        let head = AssetHead::new();
        let loader = HttpAssetLoader::new(reqwest::Client::new(), head.clone());
        let descriptor = AssetDescriptor::style("critical-css", None).with_inline("body{margin:0}");

        let node = loader.insert(&descriptor).await.unwrap();
        assert_eq!(node.content, "body{margin:0}");
        assert!(head.contains("critical-css"));
        assert!(loader.rules_ready(&node));
    }

    #[tokio::test]
    async fn test_missing_source_is_rejected() {
        let loader = HttpAssetLoader::new(reqwest::Client::new(), AssetHead::new());
        let descriptor = AssetDescriptor::script("nothing", None);

        let err = loader.insert(&descriptor).await.unwrap_err();
        assert_eq!(err, AssetError::MissingSource { id: "nothing".to_string() });
    }

    #[tokio::test]
    async fn test_relative_source_without_base_is_network_error() {
        let loader = HttpAssetLoader::new(reqwest::Client::new(), AssetHead::new());
        let descriptor = AssetDescriptor::script("app", Some("/js/app.js".to_string()));

        let err = loader.insert(&descriptor).await.unwrap_err();
        assert!(matches!(err, AssetError::Network { ref id, .. } if id == "app"));
    }
}

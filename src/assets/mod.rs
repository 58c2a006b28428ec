//! De-duplicated loading of external scripts and styles
//!
//! Every identifier maps to a single shared load. Callers asking for an
//! identifier that is pending or already resolved attach to that load; a
//! failed load is evicted so the next caller starts fresh.

pub mod loader;
pub mod state;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::AssetConfig;
use crate::util::lock;

pub use loader::{AssetHead, AssetLoader, HttpAssetLoader};
pub use state::LoadState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Style,
}

/// What to load and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub kind: AssetKind,
    pub id: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub inline: Option<String>,
    /// Load ahead of need; failures are not critical
    #[serde(default)]
    pub preload: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl AssetDescriptor {
    pub fn script(id: impl Into<String>, src: Option<String>) -> Self {
        Self::new(AssetKind::Script, id, src)
    }

    pub fn style(id: impl Into<String>, src: Option<String>) -> Self {
        Self::new(AssetKind::Style, id, src)
    }

    fn new(kind: AssetKind, id: impl Into<String>, src: Option<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            src,
            inline: None,
            preload: false,
            timeout_ms: None,
        }
    }

    pub fn with_inline(mut self, payload: impl Into<String>) -> Self {
        self.inline = Some(payload.into());
        self
    }

    pub fn preloaded(mut self) -> Self {
        self.preload = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }
}

/// An asset inserted into the page
#[derive(Debug, Clone, PartialEq)]
pub struct AssetNode {
    pub id: String,
    pub kind: AssetKind,
    pub source: Option<String>,
    pub content: String,
}

pub type AssetHandle = Arc<AssetNode>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load asset '{id}': {reason}")]
    Network { id: String, reason: String },

    #[error("asset '{id}' responded with HTTP {status}")]
    Status { id: String, status: u16 },

    #[error("asset '{id}' timed out after {timeout_ms}ms")]
    Timeout { id: String, timeout_ms: u64 },

    #[error("asset '{id}' has neither a source nor an inline payload")]
    MissingSource { id: String },
}

impl AssetError {
    pub fn asset_id(&self) -> &str {
        match self {
            AssetError::Network { id, .. }
            | AssetError::Status { id, .. }
            | AssetError::Timeout { id, .. }
            | AssetError::MissingSource { id } => id,
        }
    }
}

type SharedLoad = Shared<BoxFuture<'static, Result<AssetHandle, AssetError>>>;

struct Entry {
    generation: u64,
    load: SharedLoad,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Entry>,
    generation: u64,
    loads_started: u64,
}

#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<Mutex<CacheInner>>,
    loader: Arc<dyn AssetLoader>,
    config: AssetConfig,
}

impl AssetCache {
    pub fn new(loader: Arc<dyn AssetLoader>, config: AssetConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            loader,
            config,
        }
    }

    /// Load an asset, attaching to an existing load for the same identifier
    pub async fn load(&self, descriptor: AssetDescriptor) -> Result<AssetHandle, AssetError> {
        let id = descriptor.id.clone();
        let (generation, load) = {
            let mut inner = lock(&self.inner);
            match inner.entries.get(&id) {
                Some(entry) => {
                    debug!("Asset '{}' already requested, attaching", id);
                    (entry.generation, entry.load.clone())
                }
                None => {
                    inner.generation += 1;
                    inner.loads_started += 1;
                    let generation = inner.generation;
                    let timeout = descriptor
                        .timeout_ms
                        .map(Duration::from_millis)
                        .unwrap_or_else(|| self.config.timeout());
                    let load = run_load(
                        self.loader.clone(),
                        descriptor,
                        timeout,
                        self.config.poll_interval(),
                    )
                    .boxed()
                    .shared();
                    inner.entries.insert(
                        id.clone(),
                        Entry {
                            generation,
                            load: load.clone(),
                        },
                    );
                    (generation, load)
                }
            }
        };

        let result = load.await;
        if let Err(err) = &result {
            let mut inner = lock(&self.inner);
            if inner.entries.get(&id).map(|e| e.generation) == Some(generation) {
                warn!("Evicting failed asset '{}': {}", id, err);
                inner.entries.remove(&id);
            }
        }
        result
    }

    pub fn state(&self, id: &str) -> LoadState<AssetHandle, AssetError> {
        let inner = lock(&self.inner);
        match inner.entries.get(id) {
            None => LoadState::NotAsked,
            Some(entry) => match entry.load.peek() {
                None => LoadState::Loading,
                Some(Ok(handle)) => LoadState::Success(handle.clone()),
                Some(Err(err)) => LoadState::Failure(err.clone()),
            },
        }
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.state(id).is_success()
    }

    /// Number of underlying loads ever started
    pub fn loads_started(&self) -> u64 {
        lock(&self.inner).loads_started
    }
}

async fn run_load(
    loader: Arc<dyn AssetLoader>,
    descriptor: AssetDescriptor,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<AssetHandle, AssetError> {
    debug!("Loading {:?} asset '{}'", descriptor.kind, descriptor.id);

    let work = async {
        let node = loader.insert(&descriptor).await?;
        if node.kind == AssetKind::Style {
            while !loader.rules_ready(&node) {
                tokio::time::sleep(poll_interval).await;
            }
        }
        Ok::<_, AssetError>(Arc::new(node))
    };

    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(AssetError::Timeout {
            id: descriptor.id.clone(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowLoader {
        calls: AtomicUsize,
        fail_first: bool,
        delay: Duration,
    }

    #[async_trait]
    impl AssetLoader for SlowLoader {
        async fn insert(&self, descriptor: &AssetDescriptor) -> Result<AssetNode, AssetError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail_first && call == 0 {
                return Err(AssetError::Network {
                    id: descriptor.id.clone(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(AssetNode {
                id: descriptor.id.clone(),
                kind: descriptor.kind,
                source: descriptor.src.clone(),
                content: String::new(),
            })
        }
    }

    fn cache(fail_first: bool, delay_ms: u64) -> (AssetCache, Arc<SlowLoader>) {
        let loader = Arc::new(SlowLoader {
            calls: AtomicUsize::new(0),
            fail_first,
            delay: Duration::from_millis(delay_ms),
        });
        let config = AssetConfig {
            timeout_ms: 500,
            poll_interval_ms: 5,
        };
        (AssetCache::new(loader.clone(), config), loader)
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (cache, _) = cache(false, 20);
        assert!(cache.state("app").is_not_asked());

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.load(AssetDescriptor::script("app", None)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.state("app").is_loading());

        pending.await.unwrap().unwrap();
        assert!(cache.is_loaded("app"));
    }

    #[tokio::test]
    async fn test_resolved_entries_are_reused() {
        let (cache, loader) = cache(false, 0);
        cache.load(AssetDescriptor::script("app", None)).await.unwrap();
        cache.load(AssetDescriptor::script("app", None)).await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loads_started(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (cache, loader) = cache(true, 0);
        let err = cache.load(AssetDescriptor::script("app", None)).await.unwrap_err();
        assert_eq!(err.asset_id(), "app");
        assert!(cache.state("app").is_not_asked());

        cache.load(AssetDescriptor::script("app", None)).await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_uses_descriptor_override() {
        let (cache, _) = cache(false, 200);
        let descriptor = AssetDescriptor::script("slow", None).with_timeout(Duration::from_millis(10));
        let err = cache.load(descriptor).await.unwrap_err();
        assert_eq!(
            err,
            AssetError::Timeout {
                id: "slow".to_string(),
                timeout_ms: 10
            }
        );
    }
}

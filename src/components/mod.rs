//! Page behavior components
//!
//! Components are opaque implementers of a small lifecycle contract. They
//! are declared in markup with a name attribute and optional serialized
//! options, constructed through a [`ComponentFactory`], and tracked by the
//! [`ComponentRegistry`] as either persistent (page chrome) or disposable
//! (content that is replaced on navigation).

pub mod dependencies;
pub mod registry;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dom::{Element, NodeId};

pub use dependencies::ComponentDependencies;
pub use registry::{ComponentDeclaration, ComponentRegistry, InitOptions, PendingInit};

#[async_trait]
pub trait Component: Send {
    /// Initialize; completion is the component's ready signal
    async fn init(&mut self) -> Result<()>;

    /// Tear down. May be called on an already torn down component.
    async fn destroy(&mut self) {}

    fn prepare_animation(&mut self) {}

    fn update(&mut self) {}
}

pub type ComponentFactory = Arc<dyn Fn(ComponentContext) -> Box<dyn Component> + Send + Sync>;

/// Build a factory from a closure
pub fn factory<F, C>(build: F) -> ComponentFactory
where
    F: Fn(ComponentContext) -> C + Send + Sync + 'static,
    C: Component + 'static,
{
    Arc::new(move |context| Box::new(build(context)) as Box<dyn Component>)
}

/// Component without behavior. Stands in for real widgets when only the
/// lifecycle and dependency loading matter.
#[derive(Debug, Clone)]
pub struct Inert {
    name: String,
}

impl Inert {
    pub fn factory() -> ComponentFactory {
        factory(|context: ComponentContext| Inert { name: context.name })
    }
}

#[async_trait]
impl Component for Inert {
    async fn init(&mut self) -> Result<()> {
        log::trace!("Inert component '{}' ready", self.name);
        Ok(())
    }
}

/// Everything a component is constructed with
#[derive(Clone)]
pub struct ComponentContext {
    pub name: String,
    pub element: Element,
    pub parent: Option<ComponentHandle>,
    /// Raw options payload as found in markup
    pub options: Option<String>,
}

impl ComponentContext {
    /// Parse the raw options as JSON; `None` when no options were declared
    pub fn parse_options<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.options.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .with_context(|| format!("Invalid options for component '{}'", self.name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Survives navigation
    Persistent,
    /// Destroyed and recreated on every navigation
    Disposable,
}

/// Shared reference to a live component instance
#[derive(Clone)]
pub struct ComponentHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: String,
    element_id: NodeId,
    storage: Storage,
    destroyed: AtomicBool,
    component: tokio::sync::Mutex<Box<dyn Component>>,
}

impl ComponentHandle {
    pub(crate) fn new(name: String, element_id: NodeId, storage: Storage, component: Box<dyn Component>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                element_id,
                storage,
                destroyed: AtomicBool::new(false),
                component: tokio::sync::Mutex::new(component),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn element_id(&self) -> NodeId {
        self.inner.element_id
    }

    pub fn storage(&self) -> Storage {
        self.inner.storage
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    pub fn ptr_eq(&self, other: &ComponentHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) async fn init(&self) -> Result<()> {
        self.inner.component.lock().await.init().await
    }

    pub async fn update(&self) {
        if !self.is_destroyed() {
            self.inner.component.lock().await.update();
        }
    }

    pub async fn prepare_animation(&self) {
        if !self.is_destroyed() {
            self.inner.component.lock().await.prepare_animation();
        }
    }

    /// Run the teardown hook once; later calls are no-ops
    pub(crate) async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.component.lock().await.destroy().await;
    }
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("name", &self.inner.name)
            .field("element_id", &self.inner.element_id)
            .field("storage", &self.inner.storage)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

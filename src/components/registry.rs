//! Name → factory registry and the live component collections

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt, join_all, try_join_all};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{ComponentContext, ComponentDependencies, ComponentFactory, ComponentHandle, Storage};
use crate::assets::AssetCache;
use crate::config::SelectorConfig;
use crate::dom::{Element, NodeId, Walk};
use crate::util::lock;

/// A component declared in markup
#[derive(Debug, Clone)]
pub struct ComponentDeclaration {
    pub name: String,
    pub element: Element,
    pub options: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub load_only_first: bool,
    pub parent: Option<ComponentHandle>,
    pub storage: Storage,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            load_only_first: false,
            parent: None,
            storage: Storage::Disposable,
        }
    }
}

impl InitOptions {
    pub fn first_only() -> Self {
        Self {
            load_only_first: true,
            ..Self::default()
        }
    }

    pub fn persistent() -> Self {
        Self {
            storage: Storage::Persistent,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: ComponentHandle) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// An initialization that has been scheduled but not awaited
pub type PendingInit = BoxFuture<'static, Result<Option<ComponentHandle>>>;

#[derive(Clone)]
enum Registration {
    Ready(ComponentFactory),
    Lazy {
        dependencies: ComponentDependencies,
        factory: ComponentFactory,
    },
}

struct RegistryInner {
    factories: Mutex<HashMap<String, Registration>>,
    dependency_table: HashMap<String, ComponentDependencies>,
    persistent: Mutex<Vec<ComponentHandle>>,
    disposable: Mutex<Vec<ComponentHandle>>,
    assets: AssetCache,
    name_attr: String,
    options_attr: String,
}

#[derive(Clone)]
pub struct ComponentRegistry {
    inner: Arc<RegistryInner>,
}

impl ComponentRegistry {
    pub fn new(assets: AssetCache, selectors: &SelectorConfig) -> Self {
        Self::with_dependencies(assets, selectors, HashMap::new())
    }

    /// Registry whose registrations become lazy when `table` names them
    pub fn with_dependencies(
        assets: AssetCache,
        selectors: &SelectorConfig,
        table: HashMap<String, ComponentDependencies>,
    ) -> Self {
        let dependency_table = table
            .into_iter()
            .map(|(name, deps)| (name.to_lowercase(), deps))
            .filter(|(_, deps)| !deps.is_empty())
            .collect();
        Self {
            inner: Arc::new(RegistryInner {
                factories: Mutex::new(HashMap::new()),
                dependency_table,
                persistent: Mutex::new(Vec::new()),
                disposable: Mutex::new(Vec::new()),
                assets,
                name_attr: selectors.component_attr.clone(),
                options_attr: selectors.options_attr.clone(),
            }),
        }
    }

    pub fn register(&self, name: &str, factory: ComponentFactory) {
        let key = name.to_lowercase();
        let registration = match self.inner.dependency_table.get(&key) {
            Some(dependencies) => Registration::Lazy {
                dependencies: dependencies.clone(),
                factory,
            },
            None => Registration::Ready(factory),
        };
        lock(&self.inner.factories).insert(key, registration);
    }

    pub fn register_lazy(&self, name: &str, dependencies: ComponentDependencies, factory: ComponentFactory) {
        lock(&self.inner.factories).insert(name.to_lowercase(), Registration::Lazy { dependencies, factory });
    }

    pub fn is_registered(&self, name: &str) -> bool {
        lock(&self.inner.factories).contains_key(&name.to_lowercase())
    }

    pub fn is_lazy(&self, name: &str) -> bool {
        matches!(
            lock(&self.inner.factories).get(&name.to_lowercase()),
            Some(Registration::Lazy { .. })
        )
    }

    /// Declared elements in `scope` that are not nested in another
    /// declaration and not already bound to a live instance
    pub fn declarations(&self, scope: &Element, load_only_first: bool) -> Vec<ComponentDeclaration> {
        let live = self.live_element_ids();
        let mut found = Vec::new();
        scope.walk(&mut |el, _| {
            if el.id() == scope.id() {
                return Walk::Continue;
            }
            let Some(name) = el.attr(&self.inner.name_attr) else {
                return Walk::Continue;
            };
            if live.contains(&el.id()) {
                return Walk::SkipChildren;
            }
            found.push(ComponentDeclaration {
                name: name.trim().to_string(),
                element: el.clone(),
                options: el.attr(&self.inner.options_attr).map(str::to_string),
            });
            if load_only_first { Walk::Stop } else { Walk::SkipChildren }
        });
        found
    }

    pub fn discover(&self, scope: &Element, options: InitOptions) -> Vec<PendingInit> {
        self.declarations(scope, options.load_only_first)
            .into_iter()
            .map(|declaration| {
                let registry = self.clone();
                let parent = options.parent.clone();
                let storage = options.storage;
                async move { registry.instantiate(declaration, parent, storage).await }.boxed()
            })
            .collect()
    }

    /// Discover and initialize every component in `scope` concurrently
    pub async fn init_components(&self, scope: &Element, options: InitOptions) -> Result<Vec<ComponentHandle>> {
        let pending = self.discover(scope, options);
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Initializing {} component(s) in {}", pending.len(), scope.id());

        let mut handles = Vec::new();
        let mut first_error = None;
        for result in join_all(pending).await {
            match result {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {}
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(handles),
        }
    }

    /// Initial page load: components inside `container` are disposable,
    /// everything else under `root` is persistent
    pub async fn init_page(&self, root: &Element, container: Option<NodeId>) -> Result<()> {
        let pending: Vec<PendingInit> = self
            .declarations(root, false)
            .into_iter()
            .map(|declaration| {
                let storage = match container {
                    Some(id) if root.find(id).is_some_and(|c| c.contains(declaration.element.id())) => {
                        Storage::Disposable
                    }
                    _ => Storage::Persistent,
                };
                let registry = self.clone();
                async move { registry.instantiate(declaration, None, storage).await }.boxed()
            })
            .collect();

        try_join_all(pending).await?;
        info!(
            "Page components ready: {} persistent, {} disposable",
            self.persistent_count(),
            self.disposable_count()
        );
        Ok(())
    }

    pub async fn instantiate(
        &self,
        declaration: ComponentDeclaration,
        parent: Option<ComponentHandle>,
        storage: Storage,
    ) -> Result<Option<ComponentHandle>> {
        let Some(factory) = self.resolve(&declaration.name).await? else {
            warn!("Unknown component '{}', skipping", declaration.name);
            return Ok(None);
        };

        let element_id = declaration.element.id();
        let component = factory(ComponentContext {
            name: declaration.name.clone(),
            element: declaration.element,
            parent,
            options: declaration.options,
        });
        let handle = ComponentHandle::new(declaration.name, element_id, storage, component);
        lock(self.collection(storage)).push(handle.clone());

        if let Err(err) = handle.init().await {
            lock(self.collection(storage)).retain(|h| !h.ptr_eq(&handle));
            return Err(err.context(format!("Component '{}' failed to initialize", handle.name())));
        }
        debug!("Component '{}' ready on {}", handle.name(), element_id);
        Ok(Some(handle))
    }

    async fn resolve(&self, name: &str) -> Result<Option<ComponentFactory>> {
        let key = name.to_lowercase();
        let registration = lock(&self.inner.factories).get(&key).cloned();
        match registration {
            None => Ok(None),
            Some(Registration::Ready(factory)) => Ok(Some(factory)),
            Some(Registration::Lazy { dependencies, factory }) => {
                self.load_dependencies(name, &dependencies).await?;
                lock(&self.inner.factories).insert(key, Registration::Ready(factory.clone()));
                Ok(Some(factory))
            }
        }
    }

    async fn load_dependencies(&self, name: &str, dependencies: &ComponentDependencies) -> Result<()> {
        let assets = &self.inner.assets;
        try_join_all(dependencies.assets.iter().cloned().map(|asset| assets.load(asset)))
            .await
            .with_context(|| format!("Failed to load dependencies of component '{}'", name))?;
        if let Some(module) = dependencies.module_descriptor() {
            assets
                .load(module)
                .await
                .with_context(|| format!("Failed to load module of component '{}'", name))?;
        }
        Ok(())
    }

    /// Destroy every disposable instance bound inside `scope`
    pub async fn dispose_all(&self, scope: &Element) {
        let targets: Vec<ComponentHandle> = {
            let mut disposable = lock(&self.inner.disposable);
            let (inside, keep): (Vec<_>, Vec<_>) =
                disposable.drain(..).partition(|handle| scope.contains(handle.element_id()));
            *disposable = keep;
            inside
        };
        if targets.is_empty() {
            return;
        }
        debug!("Disposing {} component(s) in {}", targets.len(), scope.id());
        join_all(targets.iter().map(|handle| handle.destroy())).await;
    }

    /// Destroy disposable instances whose element is no longer under
    /// `live_root`
    pub async fn dispose_detached(&self, live_root: &Element) -> usize {
        let targets: Vec<ComponentHandle> = {
            let mut disposable = lock(&self.inner.disposable);
            let (detached, keep): (Vec<_>, Vec<_>) = disposable
                .drain(..)
                .partition(|handle| !live_root.contains(handle.element_id()));
            *disposable = keep;
            detached
        };
        if !targets.is_empty() {
            debug!("Disposing {} detached component(s)", targets.len());
            join_all(targets.iter().map(|handle| handle.destroy())).await;
        }
        targets.len()
    }

    /// Refresh persistent instances after the content changed around them
    pub async fn update_persistent(&self) {
        let persistent = lock(&self.inner.persistent).clone();
        join_all(persistent.iter().map(|handle| handle.update())).await;
    }

    pub fn get_by_name(&self, name: &str) -> Option<ComponentHandle> {
        lock(&self.inner.persistent)
            .iter()
            .find(|handle| handle.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn persistent_count(&self) -> usize {
        lock(&self.inner.persistent).len()
    }

    pub fn disposable_count(&self) -> usize {
        lock(&self.inner.disposable).len()
    }

    pub fn live_names(&self, storage: Storage) -> Vec<String> {
        lock(self.collection(storage))
            .iter()
            .map(|handle| handle.name().to_string())
            .collect()
    }

    pub fn disposable_handles(&self) -> Vec<ComponentHandle> {
        lock(&self.inner.disposable).clone()
    }

    pub fn is_live(&self, element: NodeId) -> bool {
        self.live_element_ids().contains(&element)
    }

    fn live_element_ids(&self) -> Vec<NodeId> {
        let persistent = lock(&self.inner.persistent);
        let disposable = lock(&self.inner.disposable);
        persistent
            .iter()
            .chain(disposable.iter())
            .map(ComponentHandle::element_id)
            .collect()
    }

    fn collection(&self, storage: Storage) -> &Mutex<Vec<ComponentHandle>> {
        match storage {
            Storage::Persistent => &self.inner.persistent,
            Storage::Disposable => &self.inner.disposable,
        }
    }
}

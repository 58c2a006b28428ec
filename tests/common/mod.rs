//! Shared fixtures for the integration tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use page_transitions::assets::{AssetDescriptor, AssetError, AssetLoader, AssetNode};
use page_transitions::browser::{HeadlessViewport, StaticFetcher, TransitionEffects};
use page_transitions::components::{Component, ComponentContext, ComponentFactory, factory};
use page_transitions::config::Config;
use page_transitions::dom::{Element, NodeId};
use page_transitions::navigation::{
    NavigationController, NavigationControllerBuilder, NavigationLifecycle, PageTransferData, SelectionContext,
    TransitionStrategy,
};

pub const ORIGIN: &str = "https://example.com";

pub const PAGE_A: &str = r##"<!DOCTYPE html>
<html><head><title>Page A</title><link rel="stylesheet" href="/css/site.css"></head>
<body>
  <header data-component-name="Header"><a id="home" href="/">Home</a></header>
  <div id="page-wrapper">
    <div id="page-wrapper__content">
      <div data-page-content>
        <section data-component-name="Hero" data-component-options='{"page":"a"}'>
          <img data-transition-media src="/img/a.jpg">
        </section>
        <a id="to-b" href="/b">B</a>
        <a id="to-b-flying" href="/b" data-transition="flying-image"><img data-transition-media src="/img/b-thumb.jpg"></a>
        <a id="to-broken" href="/broken">Broken</a>
        <a id="to-missing" href="/missing">Missing</a>
        <a id="placeholder" href="#">Menu</a>
        <a id="anchor" href="#team">Team</a>
        <a id="opt-out" href="/b" data-no-pjax>Opt out</a>
        <a id="new-window" href="/b" target="_blank">New window</a>
        <a id="download" href="/brochure.pdf" download>Brochure</a>
        <a id="modal" class="modal-open" href="/b">Modal</a>
        <a id="foreign" href="https://elsewhere.org/">Elsewhere</a>
        <a id="next-teaser" href="/c"><img data-transition-media src="/img/c.jpg"></a>
        <div data-component-name="Slider" data-component-options='{"page":"a"}'></div>
      </div>
    </div>
  </div>
</body></html>"##;

pub const PAGE_B: &str = r##"<!DOCTYPE html>
<html><head><title>Page B</title>
  <link rel="stylesheet" href="/css/site.css">
  <link rel="stylesheet" href="/css/b.css">
</head>
<body>
  <header data-component-name="Header"><a href="/">Home</a></header>
  <div id="page-wrapper">
    <div id="page-wrapper__content">
      <div data-page-content>
        <section data-component-name="Hero" data-component-options='{"page":"b"}'>
          <img data-transition-media src="/img/b.jpg">
        </section>
        <p id="marker-b">This is page B</p>
        <a id="back-to-a" href="/a">A</a>
        <div data-component-name="Gallery" data-component-options='{"page":"b"}'></div>
      </div>
    </div>
  </div>
</body></html>"##;

pub const PAGE_C: &str = r##"<!DOCTYPE html>
<html><head><title>Page C</title></head>
<body>
  <div id="page-wrapper">
    <div id="page-wrapper__content">
      <section data-component-name="Hero" data-component-options='{"page":"c"}'>
        <img data-transition-media src="/img/c.jpg">
      </section>
      <p id="marker-c">This is page C</p>
    </div>
  </div>
</body></html>"##;

/// A page without the content container
pub const PAGE_BROKEN: &str = r##"<!DOCTYPE html>
<html><head><title>Broken</title></head><body><main>No container here</main></body></html>"##;

pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

/// Ordered record of what components and strategies did
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordedOptions {
    #[serde(default)]
    page: String,
}

/// Records `init:<Name>@<page>`, `destroy:<Name>@<page>` and the other hooks
pub struct RecordingComponent {
    label: String,
    journal: Journal,
}

#[async_trait]
impl Component for RecordingComponent {
    async fn init(&mut self) -> Result<()> {
        self.journal.push(format!("init:{}", self.label));
        Ok(())
    }

    async fn destroy(&mut self) {
        self.journal.push(format!("destroy:{}", self.label));
    }

    fn prepare_animation(&mut self) {
        self.journal.push(format!("prepare:{}", self.label));
    }

    fn update(&mut self) {
        self.journal.push(format!("update:{}", self.label));
    }
}

pub fn recording_factory(journal: &Journal) -> ComponentFactory {
    let journal = journal.clone();
    factory(move |context: ComponentContext| {
        let options: RecordedOptions = context.parse_options().ok().flatten().unwrap_or_default();
        let label = if options.page.is_empty() {
            context.name.clone()
        } else {
            format!("{}@{}", context.name, options.page)
        };
        RecordingComponent {
            label,
            journal: journal.clone(),
        }
    })
}

/// Asset loader that counts underlying loads
#[derive(Default)]
pub struct RecordingLoader {
    calls: Mutex<Vec<String>>,
    delay: Duration,
    failing: HashSet<String>,
    style_polls: AtomicUsize,
    /// Stylesheets report ready after this many readiness checks
    style_ready_after: usize,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn style_ready_after(mut self, polls: usize) -> Self {
        self.style_ready_after = polls;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == id).count()
    }

    pub fn style_polls(&self) -> usize {
        self.style_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetLoader for RecordingLoader {
    async fn insert(&self, descriptor: &AssetDescriptor) -> Result<AssetNode, AssetError> {
        self.calls.lock().unwrap().push(descriptor.id.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(&descriptor.id) {
            return Err(AssetError::Network {
                id: descriptor.id.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(AssetNode {
            id: descriptor.id.clone(),
            kind: descriptor.kind,
            source: descriptor.src.clone(),
            content: String::new(),
        })
    }

    fn rules_ready(&self, _node: &AssetNode) -> bool {
        self.style_polls.fetch_add(1, Ordering::SeqCst) >= self.style_ready_after
    }
}

/// Delegates to `inner` and records each phase with the running flag as
/// seen when the phase returns
pub struct RecordingStrategy {
    inner: Arc<dyn TransitionStrategy>,
    journal: Journal,
}

impl RecordingStrategy {
    pub fn wrap(inner: Arc<dyn TransitionStrategy>, journal: &Journal) -> Arc<dyn TransitionStrategy> {
        Arc::new(Self {
            inner,
            journal: journal.clone(),
        })
    }

    fn record(&self, phase: &str, lifecycle: &NavigationLifecycle) {
        self.journal
            .push(format!("phase:{}:running={}", phase, lifecycle.state().is_running()));
    }
}

#[async_trait]
impl TransitionStrategy for RecordingStrategy {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn custom(&self, _context: &SelectionContext<'_>) -> bool {
        true
    }

    async fn before(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        let result = self.inner.before(lifecycle, data).await;
        self.record("before", lifecycle);
        result
    }

    async fn before_enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        let result = self.inner.before_enter(lifecycle, data).await;
        self.record("before_enter", lifecycle);
        result
    }

    async fn enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        let result = self.inner.enter(lifecycle, data).await;
        self.record("enter", lifecycle);
        result
    }

    async fn after_enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        let result = self.inner.after_enter(lifecycle, data).await;
        self.record("after_enter", lifecycle);
        result
    }

    async fn after(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        let result = self.inner.after(lifecycle, data).await;
        self.record("after", lifecycle);
        result
    }
}

/// Effects that finish immediately and journal `effect:*` entries
pub struct RecordingEffects {
    journal: Journal,
    /// Number of upcoming `cover` calls that reject
    failing_covers: AtomicUsize,
}

fn image_src(element: &Element) -> String {
    element
        .descendants()
        .into_iter()
        .chain(std::iter::once(element))
        .find(|el| el.tag() == "img")
        .and_then(|img| img.attr("src"))
        .unwrap_or("none")
        .to_string()
}

#[async_trait]
impl TransitionEffects for RecordingEffects {
    async fn cover(&self) -> Result<()> {
        let failing = self
            .failing_covers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            self.journal.push("effect:cover:failed");
            anyhow::bail!("cover effect interrupted");
        }
        self.journal.push("effect:cover");
        Ok(())
    }

    async fn reveal(&self) -> Result<()> {
        self.journal.push("effect:reveal");
        Ok(())
    }

    async fn morph(&self, fixture: &Element, target: Option<&Element>) -> Result<()> {
        let target = target.map(image_src).unwrap_or_else(|| "none".to_string());
        self.journal
            .push(format!("effect:morph:{}->{}", image_src(fixture), target));
        Ok(())
    }

    async fn fade_out(&self, fixtures: &[Element]) -> Result<()> {
        self.journal.push(format!("effect:fade_out:{}", fixtures.len()));
        Ok(())
    }

    async fn auto_scroll(&self, trigger: &Element) -> Result<()> {
        self.journal
            .push(format!("effect:auto_scroll:{}", trigger.attr("href").unwrap_or("")));
        Ok(())
    }
}

pub fn site() -> StaticFetcher {
    StaticFetcher::new()
        .with_page(&url("/a"), PAGE_A)
        .with_page(&url("/b"), PAGE_B)
        .with_page(&url("/c"), PAGE_C)
        .with_page(&url("/broken"), PAGE_BROKEN)
}

/// Everything a navigation test looks at
pub struct Harness {
    pub controller: NavigationController,
    pub viewport: Arc<HeadlessViewport>,
    pub fetcher: StaticFetcher,
    pub loader: Arc<RecordingLoader>,
    pub journal: Journal,
}

pub struct HarnessBuilder {
    config: Config,
    fetcher: StaticFetcher,
    viewport: HeadlessViewport,
    loader: RecordingLoader,
    strategies: Vec<Arc<dyn TransitionStrategy>>,
    failing_covers: usize,
    journal: Journal,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::instant(),
            fetcher: site(),
            viewport: HeadlessViewport::new(),
            loader: RecordingLoader::new(),
            strategies: Vec::new(),
            failing_covers: 0,
            journal: Journal::default(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn fetcher(mut self, fetcher: StaticFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn viewport(mut self, viewport: HeadlessViewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn loader(mut self, loader: RecordingLoader) -> Self {
        self.loader = loader;
        self
    }

    /// The next `count` cover effects reject
    pub fn failing_covers(mut self, count: usize) -> Self {
        self.failing_covers = count;
        self
    }

    /// Record the phases of `inner`, which then handles every request
    pub fn record_phases(mut self, inner: Arc<dyn TransitionStrategy>) -> Self {
        self.strategies.push(RecordingStrategy::wrap(inner, &self.journal));
        self
    }

    pub async fn boot(self) -> Harness {
        let viewport = Arc::new(self.viewport);
        let loader = Arc::new(self.loader);
        let mut builder: NavigationControllerBuilder = NavigationController::builder(self.config)
            .fetcher(Arc::new(self.fetcher.clone()))
            .viewport(viewport.clone())
            .effects(Arc::new(RecordingEffects {
                journal: self.journal.clone(),
                failing_covers: AtomicUsize::new(self.failing_covers),
            }))
            .asset_loader(loader.clone());
        for name in ["Header", "Hero", "Slider", "Gallery"] {
            builder = builder.component(name, recording_factory(&self.journal));
        }
        for strategy in self.strategies {
            builder = builder.strategy(strategy);
        }
        let controller = builder.build().expect("controller builds");
        controller
            .boot(&url("/a"), PAGE_A)
            .await
            .expect("page A boots");

        Harness {
            controller,
            viewport,
            fetcher: self.fetcher,
            loader,
            journal: self.journal,
        }
    }
}

impl Harness {
    pub async fn boot() -> Harness {
        HarnessBuilder::new().boot().await
    }

    /// Live element id of the element with HTML id `html_id`
    pub fn element(&self, html_id: &str) -> NodeId {
        self.controller.state().with_page(|page| {
            page.document
                .element_by_html_id(html_id)
                .unwrap_or_else(|| panic!("no element #{}", html_id))
                .id()
        })
    }

    pub fn has_element(&self, html_id: &str) -> bool {
        self.controller
            .state()
            .with_page(|page| page.document.element_by_html_id(html_id).is_some())
    }

    pub fn html(&self) -> String {
        self.controller.state().document_html()
    }
}

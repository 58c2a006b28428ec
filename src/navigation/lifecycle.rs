//! Phase orchestration shared by every strategy

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;
use url::Url;

use super::events::{EventBus, NavigationEventKind};
use super::request::{NavigationRequest, PageTransferData, TriggerKind};
use super::state::NavigationState;
use super::strategies::TransitionStrategy;
use super::NavigationError;
use crate::assets::{AssetCache, AssetDescriptor};
use crate::browser::{PageFetcher, ScrollRestoration, SyntheticEvent, TransitionEffects, Viewport};
use crate::components::{ComponentRegistry, InitOptions};
use crate::config::SelectorConfig;
use crate::dom::{Document, Element, NodeId, Selector};
use crate::monitoring::{MetricsCollector, NavigationContext, NavigationLogger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Completed,
    /// A phase failed and the browser was sent to `url` the hard way
    FellBack { url: Url, reason: String },
}

impl NavigationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, NavigationOutcome::Completed)
    }
}

/// Parsed forms of the structural selectors
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub container: Selector,
    pub content: Selector,
    pub component: Selector,
    pub transition_media: Selector,
    pub transition_attr: String,
}

impl PageSelectors {
    pub fn from_config(config: &SelectorConfig) -> Result<Self, NavigationError> {
        Ok(Self {
            container: Selector::parse(&config.container)?,
            content: Selector::parse(&config.content)?,
            component: Selector::parse(&format!("[{}]", config.component_attr))?,
            transition_media: Selector::parse(&config.transition_media)?,
            transition_attr: config.transition_attr.clone(),
        })
    }

    /// Container and content of `document`; content falls back to the
    /// container
    pub fn resolve(&self, document: &Document) -> (Option<NodeId>, Option<NodeId>) {
        let Some(container) = document.select_first(&self.container) else {
            return (None, None);
        };
        let content = container
            .select_first(&self.content)
            .map(Element::id)
            .unwrap_or(container.id());
        (Some(container.id()), Some(content))
    }
}

pub struct NavigationLifecycle {
    state: Arc<NavigationState>,
    viewport: Arc<dyn Viewport>,
    fetcher: Arc<dyn PageFetcher>,
    effects: Arc<dyn TransitionEffects>,
    registry: ComponentRegistry,
    assets: AssetCache,
    events: EventBus,
    logger: NavigationLogger,
    metrics: MetricsCollector,
    selectors: PageSelectors,
    capability: String,
}

pub(crate) struct LifecycleParts {
    pub state: Arc<NavigationState>,
    pub viewport: Arc<dyn Viewport>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub effects: Arc<dyn TransitionEffects>,
    pub registry: ComponentRegistry,
    pub assets: AssetCache,
    pub events: EventBus,
    pub logger: NavigationLogger,
    pub metrics: MetricsCollector,
    pub selectors: PageSelectors,
    pub capability: String,
}

impl NavigationLifecycle {
    pub(crate) fn new(parts: LifecycleParts) -> Self {
        Self {
            state: parts.state,
            viewport: parts.viewport,
            fetcher: parts.fetcher,
            effects: parts.effects,
            registry: parts.registry,
            assets: parts.assets,
            events: parts.events,
            logger: parts.logger,
            metrics: parts.metrics,
            selectors: parts.selectors,
            capability: parts.capability,
        }
    }

    /// Run all five phases; any failure ends in a hard navigation
    pub async fn run(&self, strategy: &dyn TransitionStrategy, request: NavigationRequest) -> NavigationOutcome {
        let context = self
            .logger
            .start_navigation(strategy.name(), request.url.as_str(), &request.correlation_id);
        let mut data = PageTransferData::new(request);

        let outcome = match self.run_phases(strategy, &mut data, &context).await {
            Ok(()) => {
                info!("Navigated to {} with '{}'", data.url(), strategy.name());
                NavigationOutcome::Completed
            }
            Err(err) => {
                let reason = format!("{:#}", err);
                self.logger.log_fallback(&context, &reason);
                self.fall_back(&data.request.url).await;
                NavigationOutcome::FellBack {
                    url: data.request.url.clone(),
                    reason,
                }
            }
        };

        let summary = match &outcome {
            NavigationOutcome::Completed => context.summary(true, None),
            NavigationOutcome::FellBack { reason, .. } => context.summary(false, Some(reason.clone())),
        };
        self.metrics.record_navigation(strategy.name(), &summary);
        self.logger.complete_navigation(&context, &summary);
        outcome
    }

    async fn run_phases(
        &self,
        strategy: &dyn TransitionStrategy,
        data: &mut PageTransferData,
        context: &NavigationContext,
    ) -> Result<()> {
        self.logger.log_phase(context, "before");
        strategy.before(self, data).await.context("before phase failed")?;

        self.logger.log_phase(context, "before_enter");
        strategy
            .before_enter(self, data)
            .await
            .context("before_enter phase failed")?;

        self.logger.log_phase(context, "enter");
        strategy.enter(self, data).await.context("enter phase failed")?;

        self.logger.log_phase(context, "after_enter");
        strategy
            .after_enter(self, data)
            .await
            .context("after_enter phase failed")?;

        self.logger.log_phase(context, "after");
        strategy.after(self, data).await.context("after phase failed")?;
        Ok(())
    }

    async fn fall_back(&self, url: &Url) {
        let removed = self.state.remove_fixtures();
        if removed > 0 {
            debug!("Removed {} transition fixture(s)", removed);
        }
        // Components started for a page that never got mounted
        let live_root = self.state.with_page(|page| page.document.root().clone());
        self.registry.dispose_detached(&live_root).await;

        self.state.finish();
        self.viewport.unlock_interaction();
        self.viewport.set_scroll_restoration(ScrollRestoration::Auto);
        self.viewport.hard_navigate(url);
    }

    fn emit(&self, kind: NavigationEventKind, data: &PageTransferData) {
        self.events.emit(kind, data.url(), data.strategy());
    }

    pub async fn before(&self, data: &mut PageTransferData) -> Result<()> {
        self.state.mark_running();
        self.emit(NavigationEventKind::TransitionStart, data);
        self.viewport.lock_interaction();
        self.viewport.blur_focus();
        self.viewport.set_scroll_restoration(ScrollRestoration::Manual);
        Ok(())
    }

    /// Fetch and parse the next page, then initialize its first component
    pub async fn before_enter(&self, data: &mut PageTransferData) -> Result<()> {
        data.current.html = self.state.document_html();
        data.outgoing = self.state.container();

        let url = data.request.url.clone();
        data.next.html = self
            .fetcher
            .fetch(&url, &self.capability)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let (current, next) = tokio::try_join!(
            parse_in_background(data.current.html.clone()),
            parse_in_background(data.next.html.clone()),
        )?;

        (data.current.container, data.current.content) = self.selectors.resolve(&current);
        (data.next.container, data.next.content) = self.selectors.resolve(&next);
        data.current.dom = Some(current);
        data.next.dom = Some(next);

        if data.next.container.is_none() {
            return Err(NavigationError::MissingContainer {
                url: url.to_string(),
                selector: self.selectors.container.to_string(),
            }
            .into());
        }
        self.emit(NavigationEventKind::DomReady, data);

        self.preload_assets(data);

        if let Some(container) = data.next.container_element() {
            let first = self
                .registry
                .init_components(container, InitOptions::first_only())
                .await
                .context("Failed to initialize the first component of the next page")?;
            for handle in &first {
                handle.prepare_animation().await;
            }
        }
        Ok(())
    }

    /// Mount the next container after the current one and repoint the
    /// shared references at it
    pub fn mount_next(&self, data: &mut PageTransferData) -> Result<()> {
        let title = data.next.dom.as_ref().and_then(Document::title);
        let content = data.next.content;
        let container = data.next.take_container().ok_or_else(|| NavigationError::MissingContainer {
            url: data.url().to_string(),
            selector: self.selectors.container.to_string(),
        })?;
        let container_id = container.id();

        self.state.mount_after_container(container);
        data.outgoing = self
            .state
            .swap_references(data.request.url.clone(), container_id, content);

        if let Some(title) = title.as_deref().filter(|t| !t.is_empty()) {
            self.state.set_title(title);
        }
        if data.request.kind != TriggerKind::History {
            self.viewport.push_history(&data.request.url, title.as_deref());
        }
        Ok(())
    }

    pub async fn after_enter(&self, data: &mut PageTransferData) -> Result<()> {
        if let Some(old) = data.outgoing.and_then(|id| self.state.remove_element(id)) {
            self.registry.dispose_all(&old).await;
        }

        self.viewport.set_scroll_tracking(false);
        self.viewport.scroll_to(data.request.scroll_offset.unwrap_or(0));
        self.viewport.set_scroll_tracking(true);

        self.emit(NavigationEventKind::InitBefore, data);
        let container = self
            .state
            .container_element()
            .context("Live container missing after mount")?;
        self.registry
            .init_components(&container, InitOptions::default())
            .await
            .context("Failed to initialize components of the next page")?;
        self.registry.update_persistent().await;

        self.viewport.dispatch_synthetic(SyntheticEvent::DomContentLoaded);
        self.viewport.dispatch_synthetic(SyntheticEvent::Load);
        self.emit(NavigationEventKind::InitAfter, data);

        let fixtures = self.state.fixtures();
        if !fixtures.is_empty() {
            self.effects.fade_out(&fixtures).await?;
            self.state.remove_fixtures();
        }
        Ok(())
    }

    pub async fn after(&self, data: &mut PageTransferData) -> Result<()> {
        self.emit(NavigationEventKind::TransitionEndBefore, data);
        self.viewport.unlock_interaction();
        self.viewport.set_scroll_restoration(ScrollRestoration::Auto);
        self.viewport.refresh_scroll_observers();
        self.viewport.resume_media();
        self.emit(NavigationEventKind::TransitionEnd, data);
        self.state.finish();
        Ok(())
    }

    /// Clip-clone of the trigger's media appended to the body
    pub fn add_clip_fixture(&self, trigger: &Element) -> Element {
        let media = trigger.select_first(&self.selectors.transition_media).unwrap_or(trigger);
        let fixture = Element::new("div")
            .with_attr("class", "transition-fixture")
            .with_attr("data-fixture-for", trigger.id().to_string())
            .with_child(media.duplicate());
        self.state.add_fixture(fixture.clone());
        fixture
    }

    /// Media of the destination's first component, or of its container
    pub fn destination_media(&self, data: &PageTransferData) -> Option<Element> {
        let container = data.next.container_element()?;
        let scope = container.select_first(&self.selectors.component).unwrap_or(container);
        scope.select_first(&self.selectors.transition_media).cloned()
    }

    /// Morph the fixture onto the destination media, then mount
    pub async fn morph_into_next(&self, data: &mut PageTransferData) -> Result<()> {
        let target = self.destination_media(data);
        if let Some(fixture) = self.state.fixtures().first() {
            self.effects.morph(fixture, target.as_ref()).await?;
        }
        self.mount_next(data)
    }

    /// Fire-and-forget loads of head assets the next page adds
    fn preload_assets(&self, data: &PageTransferData) {
        let (Some(current), Some(next)) = (&data.current.dom, &data.next.dom) else {
            return;
        };
        let present = head_assets(current, &self.state.url());
        for descriptor in head_assets(next, &data.request.url) {
            if present.iter().any(|p| p.id == descriptor.id) || !self.assets.state(&descriptor.id).is_not_asked() {
                continue;
            }
            debug!("Preloading {:?} asset '{}'", descriptor.kind, descriptor.id);
            let assets = self.assets.clone();
            tokio::spawn(async move {
                if let Err(err) = assets.load(descriptor.preloaded()).await {
                    debug!("Preload failed: {}", err);
                }
            });
        }
    }

    pub fn state(&self) -> &Arc<NavigationState> {
        &self.state
    }

    pub fn viewport(&self) -> &Arc<dyn Viewport> {
        &self.viewport
    }

    pub fn effects(&self) -> &Arc<dyn TransitionEffects> {
        &self.effects
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn logger(&self) -> &NavigationLogger {
        &self.logger
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn selectors(&self) -> &PageSelectors {
        &self.selectors
    }

    pub fn capability_header(&self) -> &str {
        &self.capability
    }
}

async fn parse_in_background(markup: String) -> Result<Document> {
    tokio::task::spawn_blocking(move || Document::parse(&markup))
        .await
        .context("Page parsing task failed")
}

/// Stylesheets and scripts referenced from the head, keyed by absolute URL
fn head_assets(document: &Document, base: &Url) -> Vec<AssetDescriptor> {
    let Some(head) = document.head() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for el in head.descendants() {
        let (src, style) = match el.tag() {
            "link" if el.attr("rel").is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet")) => {
                (el.attr("href"), true)
            }
            "script" => (el.attr("src"), false),
            _ => continue,
        };
        let Some(absolute) = src.and_then(|src| base.join(src).ok()) else {
            continue;
        };
        let id = absolute.to_string();
        out.push(if style {
            AssetDescriptor::style(id.clone(), Some(id))
        } else {
            AssetDescriptor::script(id.clone(), Some(id))
        });
    }
    out
}

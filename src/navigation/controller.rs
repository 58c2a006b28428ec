//! Entry points: interception, guard, strategy selection

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

use super::events::{EventBus, NavigationEvent};
use super::lifecycle::{LifecycleParts, NavigationLifecycle, NavigationOutcome, PageSelectors};
use super::request::{NavigationRequest, TriggerKind};
use super::rules::{ExclusionRules, InterceptionPolicy, PassThrough};
use super::state::NavigationState;
use super::strategies::{SelectionContext, StrategySet, TransitionStrategy};
use super::NavigationError;
use crate::assets::loader::http_client;
use crate::assets::{AssetCache, AssetHead, AssetLoader, HttpAssetLoader};
use crate::browser::{
    HeadlessViewport, HttpPageFetcher, PageFetcher, SyntheticEvent, TimedEffects, TransitionEffects, Viewport,
    capability_header,
};
use crate::components::{ComponentFactory, ComponentRegistry};
use crate::config::Config;
use crate::dom::{Document, NodeId, Selector};
use crate::monitoring::{MetricsCollector, NavigationLogger};

/// Result of handing an activation to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Not intercepted; the browser default applies
    PassThrough(PassThrough),
    /// Refused because another navigation is running
    Busy,
    Navigated(NavigationOutcome),
}

#[derive(Clone)]
pub struct NavigationController {
    lifecycle: Arc<NavigationLifecycle>,
    strategies: StrategySet,
    policy: InterceptionPolicy,
}

impl NavigationController {
    pub fn builder(config: Config) -> NavigationControllerBuilder {
        NavigationControllerBuilder::new(config)
    }

    /// Initial page load: parse, resolve the container, start components
    pub async fn boot(&self, url: &str, markup: &str) -> Result<()> {
        let url = parse_url(url)?;
        let markup = markup.to_string();
        let document = tokio::task::spawn_blocking(move || Document::parse(&markup))
            .await
            .context("Page parsing task failed")?;

        let (container, content) = self.lifecycle.selectors().resolve(&document);
        if container.is_none() {
            return Err(NavigationError::MissingContainer {
                url: url.to_string(),
                selector: self.lifecycle.selectors().container.to_string(),
            }
            .into());
        }
        let root = document.root().clone();
        self.state().load_page(url.clone(), document, container, content);

        self.registry()
            .init_page(&root, container)
            .await
            .with_context(|| format!("Failed to start components of {}", url))?;

        let viewport = self.lifecycle.viewport();
        viewport.dispatch_synthetic(SyntheticEvent::DomContentLoaded);
        viewport.dispatch_synthetic(SyntheticEvent::Load);
        info!("Booted {}", url);
        Ok(())
    }

    /// `Some(reason)` when activating `link` keeps the browser default
    pub fn should_prevent(&self, link: NodeId) -> Option<PassThrough> {
        self.state()
            .with_page(|page| self.policy.evaluate(&page.document, &page.url, link))
    }

    /// A click on `link` in the live page
    pub async fn handle_activation(&self, link: NodeId) -> Activation {
        if let Some(reason) = self.should_prevent(link) {
            return Activation::PassThrough(reason);
        }
        let resolved = self.state().with_page(|page| {
            let trigger = page.document.find(link)?;
            let url = page.url.join(trigger.attr("href")?.trim()).ok()?;
            Some((trigger.clone(), url))
        });
        let Some((trigger, url)) = resolved else {
            return Activation::PassThrough(PassThrough::MissingHref);
        };

        self.start(NavigationRequest::new(url, TriggerKind::Click).with_trigger(Some(trigger)))
            .await
    }

    /// Navigate without a trigger element
    pub async fn navigate(&self, target: &str) -> Result<Activation> {
        let url = self.resolve_target(target)?;
        Ok(self.start(NavigationRequest::new(url, TriggerKind::Programmatic)).await)
    }

    /// Like [`navigate`](Self::navigate) but lands at `offset`
    pub async fn navigate_to_offset(&self, target: &str, offset: u32) -> Result<Activation> {
        let url = self.resolve_target(target)?;
        let request = NavigationRequest::new(url, TriggerKind::Programmatic).with_scroll_offset(offset);
        Ok(self.start(request).await)
    }

    /// The page end was reached; `trigger` is the next-page teaser
    pub async fn auto_navigate(&self, trigger: NodeId, target: &str) -> Result<Activation> {
        let url = self.resolve_target(target)?;
        let trigger = self.state().with_page(|page| page.document.find(trigger).cloned());
        Ok(self
            .start(NavigationRequest::new(url, TriggerKind::Auto).with_trigger(trigger))
            .await)
    }

    /// Back/forward to `target`; the history entry already exists
    pub async fn handle_history(&self, target: &str) -> Result<Activation> {
        let url = self.resolve_target(target)?;
        Ok(self.start(NavigationRequest::new(url, TriggerKind::History)).await)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
        self.lifecycle.events().subscribe()
    }

    async fn start(&self, request: NavigationRequest) -> Activation {
        if !self.state().try_begin() {
            self.lifecycle.logger().log_busy(request.url.as_str());
            self.lifecycle.metrics().record_busy();
            return Activation::Busy;
        }

        let strategy = self.strategies.select(&SelectionContext {
            trigger: request.trigger.as_ref(),
            kind: request.kind,
            transition_attr: &self.lifecycle.selectors().transition_attr,
        });
        debug!("Selected '{}' for {}", strategy.name(), request.url);

        let request = request
            .with_strategy(strategy.name())
            .with_correlation_id(self.lifecycle.logger().correlation_id());
        Activation::Navigated(self.lifecycle.run(strategy.as_ref(), request).await)
    }

    fn resolve_target(&self, target: &str) -> Result<Url, NavigationError> {
        self.state()
            .url()
            .join(target.trim())
            .map_err(|e| NavigationError::InvalidUrl {
                target: target.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn state(&self) -> &Arc<NavigationState> {
        self.lifecycle.state()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        self.lifecycle.registry()
    }

    pub fn assets(&self) -> &AssetCache {
        self.lifecycle.assets()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        self.lifecycle.metrics()
    }

    pub fn lifecycle(&self) -> &NavigationLifecycle {
        &self.lifecycle
    }

    pub fn policy(&self) -> &InterceptionPolicy {
        &self.policy
    }

    pub fn capability_header(&self) -> &str {
        self.lifecycle.capability_header()
    }
}

fn parse_url(url: &str) -> Result<Url, NavigationError> {
    Url::parse(url.trim()).map_err(|e| NavigationError::InvalidUrl {
        target: url.to_string(),
        reason: e.to_string(),
    })
}

pub struct NavigationControllerBuilder {
    config: Config,
    fetcher: Option<Arc<dyn PageFetcher>>,
    viewport: Option<Arc<dyn Viewport>>,
    effects: Option<Arc<dyn TransitionEffects>>,
    loader: Option<Arc<dyn AssetLoader>>,
    components: Vec<(String, ComponentFactory)>,
    strategies: StrategySet,
}

impl NavigationControllerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            fetcher: None,
            viewport: None,
            effects: None,
            loader: None,
            components: Vec::new(),
            strategies: StrategySet::default(),
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn effects(mut self, effects: Arc<dyn TransitionEffects>) -> Self {
        self.effects = Some(effects);
        self
    }

    pub fn asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn component(mut self, name: &str, factory: ComponentFactory) -> Self {
        self.components.push((name.to_string(), factory));
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn TransitionStrategy>) -> Self {
        self.strategies.register(strategy);
        self
    }

    pub fn build(self) -> Result<NavigationController> {
        let config = self.config;
        let selectors = PageSelectors::from_config(&config.selectors)?;
        let policy = InterceptionPolicy::new(
            Selector::parse(&config.selectors.wrapper).map_err(NavigationError::from)?,
            ExclusionRules::new(&config.interception.exclusions).map_err(NavigationError::from)?,
        );

        let fetcher: Arc<dyn PageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpPageFetcher::new(&config.fetch)?),
        };
        let viewport: Arc<dyn Viewport> = self.viewport.unwrap_or_else(|| Arc::new(HeadlessViewport::new()));
        let effects: Arc<dyn TransitionEffects> = self
            .effects
            .unwrap_or_else(|| Arc::new(TimedEffects::new(config.effects.clone())));
        let loader: Arc<dyn AssetLoader> = match self.loader {
            Some(loader) => loader,
            None => {
                let client = http_client(&config.fetch.user_agent, config.assets.timeout())
                    .context("Failed to build asset HTTP client")?;
                Arc::new(HttpAssetLoader::new(client, AssetHead::new()))
            }
        };

        let assets = AssetCache::new(loader, config.assets.clone());
        let registry = ComponentRegistry::with_dependencies(assets.clone(), &config.selectors, config.components.clone());
        for (name, factory) in self.components {
            registry.register(&name, factory);
        }

        let capability = capability_header(viewport.as_ref());
        debug!("Capability header: {}", capability);

        let blank = Url::parse("about:blank").context("Failed to parse placeholder URL")?;
        let lifecycle = NavigationLifecycle::new(LifecycleParts {
            state: Arc::new(NavigationState::new(blank, Document::parse(""))),
            viewport,
            fetcher,
            effects,
            registry,
            assets,
            events: EventBus::default(),
            logger: NavigationLogger::new(config.monitoring.clone()),
            metrics: MetricsCollector::new(config.monitoring.clone()),
            selectors,
            capability,
        });

        Ok(NavigationController {
            lifecycle: Arc::new(lifecycle),
            strategies: self.strategies,
            policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticFetcher;

    const PAGE_A: &str = r##"<html><head><title>A</title></head><body>
        <div id="page-wrapper">
          <div id="page-wrapper__content"><a id="to-b" href="/b">B</a><a id="anchor" href="#top">Top</a></div>
        </div></body></html>"##;

    fn controller() -> NavigationController {
        NavigationController::builder(Config::instant())
            .fetcher(Arc::new(StaticFetcher::new()))
            .viewport(Arc::new(HeadlessViewport::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_boot_requires_container() {
        let controller = controller();
        let err = controller
            .boot("https://example.com/", "<html><body>no container</body></html>")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NavigationError>(),
            Some(NavigationError::MissingContainer { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_prevent_uses_live_page() {
        let controller = controller();
        controller.boot("https://example.com/a", PAGE_A).await.unwrap();
        let (to_b, anchor) = controller.state().with_page(|page| {
            (
                page.document.element_by_html_id("to-b").unwrap().id(),
                page.document.element_by_html_id("anchor").unwrap().id(),
            )
        });

        assert_eq!(controller.should_prevent(to_b), None);
        assert_eq!(
            controller.should_prevent(anchor),
            Some(PassThrough::InPageAnchor("top".to_string()))
        );
    }

    #[tokio::test]
    async fn test_invalid_target_is_rejected() {
        let controller = controller();
        controller.boot("https://example.com/a", PAGE_A).await.unwrap();
        let err = controller.navigate("http://[::1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NavigationError>(),
            Some(NavigationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_invalid_exclusion_fails_build() {
        let mut config = Config::instant();
        config.add_exclusion("a[href");
        let result = NavigationController::builder(config)
            .fetcher(Arc::new(StaticFetcher::new()))
            .build();
        assert!(result.is_err());
    }
}

//! Transition strategies
//!
//! A strategy is stateless and implements the five phases. The default
//! phase bodies are the plain [`NavigationLifecycle`] primitives, so a
//! strategy only overrides the phases where it differs.

mod auto_scroll_next;
mod flying_image;
mod general;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use auto_scroll_next::AutoScrollNext;
pub use flying_image::FlyingImage;
pub use general::General;

use super::lifecycle::NavigationLifecycle;
use super::request::{PageTransferData, TriggerKind};
use crate::dom::Element;

/// What strategy selection looks at
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub trigger: Option<&'a Element>,
    pub kind: TriggerKind,
    /// Attribute on the trigger naming the transition it asks for
    pub transition_attr: &'a str,
}

impl<'a> SelectionContext<'a> {
    pub fn requested_transition(&self) -> Option<&'a str> {
        self.trigger?.attr(self.transition_attr)
    }
}

#[async_trait]
pub trait TransitionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this strategy wants the request
    fn custom(&self, _context: &SelectionContext<'_>) -> bool {
        false
    }

    async fn before(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.before(data).await
    }

    async fn before_enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.before_enter(data).await
    }

    async fn enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.mount_next(data)
    }

    async fn after_enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.after_enter(data).await
    }

    async fn after(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.after(data).await
    }
}

/// Ordered candidates plus the fallback used when none claims a request
#[derive(Clone)]
pub struct StrategySet {
    candidates: Vec<Arc<dyn TransitionStrategy>>,
    fallback: Arc<dyn TransitionStrategy>,
}

impl Default for StrategySet {
    fn default() -> Self {
        Self {
            candidates: vec![Arc::new(AutoScrollNext), Arc::new(FlyingImage)],
            fallback: Arc::new(General),
        }
    }
}

impl StrategySet {
    /// Register a strategy ahead of the built-in candidates
    pub fn register(&mut self, strategy: Arc<dyn TransitionStrategy>) {
        self.candidates.insert(0, strategy);
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn TransitionStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn select(&self, context: &SelectionContext<'_>) -> Arc<dyn TransitionStrategy> {
        self.candidates
            .iter()
            .find(|strategy| strategy.custom(context))
            .unwrap_or(&self.fallback)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.candidates
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|strategy| strategy.name().to_string())
            .collect()
    }
}

use anyhow::Result;
use async_trait::async_trait;

use super::{SelectionContext, TransitionStrategy};
use crate::navigation::lifecycle::NavigationLifecycle;
use crate::navigation::request::{PageTransferData, TriggerKind};

/// Reaching the end of a page scrolls its next-page teaser into view and
/// morphs it into the next page
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoScrollNext;

#[async_trait]
impl TransitionStrategy for AutoScrollNext {
    fn name(&self) -> &str {
        "auto-scroll-next"
    }

    fn custom(&self, context: &SelectionContext<'_>) -> bool {
        context.kind == TriggerKind::Auto
    }

    async fn before(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.before(data).await?;
        if let Some(trigger) = &data.request.trigger {
            lifecycle.effects().auto_scroll(trigger).await?;
            lifecycle.add_clip_fixture(trigger);
        }
        lifecycle.state().set_seamless(true);
        Ok(())
    }

    async fn enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.morph_into_next(data).await
    }
}

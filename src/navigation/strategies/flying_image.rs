use anyhow::Result;
use async_trait::async_trait;

use super::{SelectionContext, TransitionStrategy};
use crate::navigation::lifecycle::NavigationLifecycle;
use crate::navigation::request::{PageTransferData, TriggerKind};

pub const FLYING_IMAGE: &str = "flying-image";

/// The trigger's media flies to where the destination shows it.
/// Requested by the trigger with `data-transition="flying-image"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlyingImage;

#[async_trait]
impl TransitionStrategy for FlyingImage {
    fn name(&self) -> &str {
        FLYING_IMAGE
    }

    fn custom(&self, context: &SelectionContext<'_>) -> bool {
        context.kind != TriggerKind::Auto && context.requested_transition() == Some(FLYING_IMAGE)
    }

    async fn before(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.before(data).await?;
        if let Some(trigger) = &data.request.trigger {
            lifecycle.add_clip_fixture(trigger);
        }
        lifecycle.state().set_seamless(true);
        Ok(())
    }

    async fn enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.morph_into_next(data).await
    }
}

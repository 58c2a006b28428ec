use anyhow::Result;
use async_trait::async_trait;

use super::TransitionStrategy;
use crate::navigation::lifecycle::NavigationLifecycle;
use crate::navigation::request::PageTransferData;

/// Cover the old content, swap, reveal the new content
#[derive(Debug, Clone, Copy, Default)]
pub struct General;

#[async_trait]
impl TransitionStrategy for General {
    fn name(&self) -> &str {
        "general"
    }

    async fn enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.effects().cover().await?;
        lifecycle.mount_next(data)
    }

    async fn after_enter(&self, lifecycle: &NavigationLifecycle, data: &mut PageTransferData) -> Result<()> {
        lifecycle.after_enter(data).await?;
        lifecycle.effects().reveal().await
    }
}

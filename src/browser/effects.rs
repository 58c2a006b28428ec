//! Visual effects run inside the transition phases
//!
//! How an effect looks is up to the implementer; the engine only awaits
//! completion.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

use crate::config::EffectConfig;
use crate::dom::Element;

#[async_trait]
pub trait TransitionEffects: Send + Sync {
    /// Hide the outgoing content
    async fn cover(&self) -> Result<()>;

    /// Show the incoming content
    async fn reveal(&self) -> Result<()>;

    /// Morph the clip-clone fixture onto `target`, or in place when the
    /// destination has no matching media
    async fn morph(&self, fixture: &Element, target: Option<&Element>) -> Result<()>;

    async fn fade_out(&self, fixtures: &[Element]) -> Result<()>;

    /// Scroll the window until `trigger` fills the view
    async fn auto_scroll(&self, trigger: &Element) -> Result<()>;
}

/// Effects that take as long as configured and draw nothing
#[derive(Debug, Clone)]
pub struct TimedEffects {
    config: EffectConfig,
}

impl TimedEffects {
    pub fn new(config: EffectConfig) -> Self {
        Self { config }
    }

    async fn wait(&self, name: &str, ms: u64) {
        debug!("Effect '{}' ({}ms)", name, ms);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl TransitionEffects for TimedEffects {
    async fn cover(&self) -> Result<()> {
        self.wait("cover", self.config.cover_ms).await;
        Ok(())
    }

    async fn reveal(&self) -> Result<()> {
        self.wait("reveal", self.config.reveal_ms).await;
        Ok(())
    }

    async fn morph(&self, fixture: &Element, target: Option<&Element>) -> Result<()> {
        match target {
            Some(target) => debug!("Morphing {} onto {}", fixture.id(), target.id()),
            None => debug!("Morphing {} in place", fixture.id()),
        }
        self.wait("morph", self.config.morph_ms).await;
        Ok(())
    }

    async fn fade_out(&self, fixtures: &[Element]) -> Result<()> {
        if fixtures.is_empty() {
            return Ok(());
        }
        self.wait("fade-out", self.config.fade_out_ms).await;
        Ok(())
    }

    async fn auto_scroll(&self, trigger: &Element) -> Result<()> {
        debug!("Auto-scrolling to {}", trigger.id());
        self.wait("auto-scroll", self.config.auto_scroll_ms).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_instant_effects_do_not_wait() {
        let effects = TimedEffects::new(EffectConfig::instant());
        let started = Instant::now();
        effects.cover().await.unwrap();
        effects.morph(&Element::new("img"), None).await.unwrap();
        effects.reveal().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_timed_effect_waits() {
        let config = EffectConfig {
            cover_ms: 30,
            ..EffectConfig::instant()
        };
        let effects = TimedEffects::new(config);
        let started = Instant::now();
        effects.cover().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}

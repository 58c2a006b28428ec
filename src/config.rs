use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::components::ComponentDependencies;
use crate::monitoring::MonitoringConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub interception: InterceptionConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub effects: EffectConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Dependency table: component name -> assets to load before construction
    #[serde(default)]
    pub components: HashMap<String, ComponentDependencies>,
}

/// Selectors and attribute names describing the page structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Region whose links are candidates for interception
    #[serde(default = "default_wrapper")]
    pub wrapper: String,
    /// Content root replaced on every navigation
    #[serde(default = "default_container")]
    pub container: String,
    /// Inner region that actually changes; falls back to the container
    #[serde(default = "default_content")]
    pub content: String,
    #[serde(default = "default_component_attr")]
    pub component_attr: String,
    #[serde(default = "default_options_attr")]
    pub options_attr: String,
    /// Media taking part in seamless transitions
    #[serde(default = "default_transition_media")]
    pub transition_media: String,
    /// Attribute on a trigger naming the transition it asks for
    #[serde(default = "default_transition_attr")]
    pub transition_attr: String,
}

fn default_wrapper() -> String {
    "#page-wrapper".to_string()
}

fn default_container() -> String {
    "#page-wrapper__content".to_string()
}

fn default_content() -> String {
    "[data-page-content]".to_string()
}

fn default_component_attr() -> String {
    "data-component-name".to_string()
}

fn default_options_attr() -> String {
    "data-component-options".to_string()
}

fn default_transition_media() -> String {
    "[data-transition-media]".to_string()
}

fn default_transition_attr() -> String {
    "data-transition".to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            wrapper: default_wrapper(),
            container: default_container(),
            content: default_content(),
            component_attr: default_component_attr(),
            options_attr: default_options_attr(),
            transition_media: default_transition_media(),
            transition_attr: default_transition_attr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InterceptionConfig {
    /// Extra selectors for links that must keep default browser navigation
    #[serde(default)]
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Header carrying the image formats this client accepts
    #[serde(default = "default_capability_header")]
    pub capability_header: String,
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("page-transitions/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_capability_header() -> String {
    "Accept".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            capability_header: default_capability_header(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Default timeout for a script/style load
    #[serde(default = "default_asset_timeout")]
    pub timeout_ms: u64,
    /// Interval between stylesheet readiness checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_asset_timeout() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    50
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_asset_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl AssetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Durations handed to the transition effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(default = "default_cover")]
    pub cover_ms: u64,
    #[serde(default = "default_reveal")]
    pub reveal_ms: u64,
    #[serde(default = "default_morph")]
    pub morph_ms: u64,
    #[serde(default = "default_fade_out")]
    pub fade_out_ms: u64,
    #[serde(default = "default_auto_scroll")]
    pub auto_scroll_ms: u64,
}

fn default_cover() -> u64 {
    600
}

fn default_reveal() -> u64 {
    600
}

fn default_morph() -> u64 {
    900
}

fn default_fade_out() -> u64 {
    300
}

fn default_auto_scroll() -> u64 {
    800
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            cover_ms: default_cover(),
            reveal_ms: default_reveal(),
            morph_ms: default_morph(),
            fade_out_ms: default_fade_out(),
            auto_scroll_ms: default_auto_scroll(),
        }
    }
}

impl EffectConfig {
    /// All effects complete immediately
    pub fn instant() -> Self {
        Self {
            cover_ms: 0,
            reveal_ms: 0,
            morph_ms: 0,
            fade_out_ms: 0,
            auto_scroll_ms: 0,
        }
    }
}

impl Config {
    /// Configuration with zero-length effects and short asset timeouts
    pub fn instant() -> Self {
        Self {
            effects: EffectConfig::instant(),
            assets: AssetConfig {
                timeout_ms: 2_000,
                poll_interval_ms: 5,
            },
            ..Self::default()
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("page-transitions")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".page-transitions")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        debug!(
            "Loaded config with {} exclusions and {} component entries",
            config.interception.exclusions.len(),
            config.components.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", path);

        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
            }
        }

        let config_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        info!("Config saved successfully");
        Ok(())
    }

    /// Add an external exclusion rule unless an identical one is present
    pub fn add_exclusion(&mut self, selector: impl Into<String>) {
        let selector = selector.into();
        let trimmed = selector.trim();
        if !self.interception.exclusions.iter().any(|s| s.trim() == trimmed) {
            self.interception.exclusions.push(trimmed.to_string());
        }
    }
}

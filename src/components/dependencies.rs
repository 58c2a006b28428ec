use serde::{Deserialize, Serialize};

use crate::assets::AssetDescriptor;

/// Assets a component needs before it can be constructed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentDependencies {
    #[serde(default)]
    pub assets: Vec<AssetDescriptor>,
    /// Code module loaded after the assets, right before construction
    #[serde(default)]
    pub module: Option<String>,
}

impl ComponentDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset: AssetDescriptor) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.module.is_none()
    }

    /// Descriptor for the code module, loaded as a script keyed by its locator
    pub fn module_descriptor(&self) -> Option<AssetDescriptor> {
        self.module
            .as_ref()
            .map(|module| AssetDescriptor::script(format!("module:{}", module), Some(module.clone())))
    }
}

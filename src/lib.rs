pub mod assets;
pub mod browser;
pub mod components;
pub mod config;
pub mod dom;
pub mod monitoring;
pub mod navigation;
mod util;

pub use config::Config;
pub use navigation::{Activation, NavigationController, NavigationOutcome};

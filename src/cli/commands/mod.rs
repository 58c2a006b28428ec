pub mod check;
pub mod navigate;

use anyhow::Result;
use page_transitions::Config;
use std::path::Path;

pub use check::{CheckCommands, handle_check_command};
pub use navigate::{NavigateCommands, handle_navigate_command};

/// Config from `path` or the default location, plus command line exclusions
pub fn load_config(path: Option<&Path>, exclusions: &[String]) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    for selector in exclusions {
        config.add_exclusion(selector.as_str());
    }
    Ok(config)
}

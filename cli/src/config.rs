use std::path::Path;

use serde::Deserialize;

use codeblock::PortLayout;

/// Contents of a `--config` TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Output port spacing.
    #[serde(default)]
    pub layout: PortLayout,
}

/// Read the config file, or the defaults when none was given.
pub fn load(path: Option<&Path>) -> Result<Config, String> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("invalid config '{}': {}", path.display(), e))
}

use anyhow::{Context, Result};
use fs_err::read_to_string;
use serde::Deserialize;
use std::path::Path;

/// Looked up when no `--config` flag is given. Absence is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "./config/routes.toml";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub display: DisplayConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Write to a temporary sibling file and rename it over the route file
    pub atomic_save: bool,
    pub indent: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            atomic_save: true,
            indent: 4,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub not_found_message: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            not_found_message: "No routes found".to_string(),
        }
    }
}

/// Loads the configuration. An explicitly requested file must exist; the default
/// location is only read if present.
pub fn load(explicit_path: Option<&Path>) -> Result<Config> {
    let path = match explicit_path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    let text = read_to_string(path)?;
    let config: Config = toml::from_str(&text)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded configuration");
    Ok(config)
}

mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub async fn load() -> Result<Config> {
    let explicit = env::var("CONFIG_PATH").ok();
    let mut config = load_from(explicit.as_deref()).await?;
    config.apply_overrides(|key| env::var(key).ok())?;
    Ok(config)
}

/// Reads the YAML configuration.
///
/// An explicit path must exist. Without one, `config.yaml` is used when present
/// and built-in defaults otherwise.
pub async fn load_from(explicit: Option<&str>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH,
        None => {
            debug!("No configuration file found, using defaults");
            return Ok(Config::default());
        }
    };

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| Error::config(format!("Cannot read {}: {}", config_path, e)))?;
    let config: Config = serde_yaml::from_str(&config_str)
        .map_err(|e| Error::config(format!("Invalid configuration in {}: {}", config_path, e)))?;

    Ok(config)
}

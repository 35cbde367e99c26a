//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod output;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use medex_core::MedexConfig;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medex")
        .join("config.json")
}

/// Load the configuration from `path`, else from the default location if a
/// file exists there, else built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<MedexConfig> {
    let config = match path {
        Some(path) => MedexConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                debug!("Using config from {}", default_path.display());
                MedexConfig::from_file(&default_path)?
            } else {
                MedexConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

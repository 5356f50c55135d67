//! Config file location and reading.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "agent.yaml";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "VERIFORGE_CONFIG_DIR";

/// `$VERIFORGE_CONFIG_DIR`, else `~/.veriforge`.
pub fn config_dir() -> PathBuf {
    config_dir_from(std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from))
}

fn config_dir_from(overridden: Option<PathBuf>) -> PathBuf {
    overridden.unwrap_or_else(|| {
        dirs::home_dir()
            .map(|home| home.join(".veriforge"))
            .unwrap_or_else(|| PathBuf::from(".veriforge"))
    })
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config as a raw YAML tree, before env substitution.
///
/// A missing file is an empty config.
pub async fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let value: Option<serde_json::Value> = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(value.unwrap_or_else(|| serde_json::Value::Object(Default::default())))
}

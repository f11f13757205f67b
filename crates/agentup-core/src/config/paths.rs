//! Config and state path resolution helpers.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "agentup";
const CONFIG_FILE: &str = "config.toml";
const STATUS_FILE: &str = "install-status.json";

pub fn default_config_dir() -> anyhow::Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(APP_DIR))
}

/// State lives under the platform state dir, falling back to local data.
pub fn default_state_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine state directory"))?;
    Ok(base.join(APP_DIR))
}

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

pub fn status_path(state_dir: &Path) -> PathBuf {
    state_dir.join(STATUS_FILE)
}

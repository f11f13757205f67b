//! Config store for loading and saving config.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{Settings, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::from_dir(paths::default_config_dir()?))
    }

    pub fn from_dir(config_dir: PathBuf) -> Self {
        Self {
            config_path: paths::config_path(&config_dir),
        }
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load settings; a missing file yields the defaults.
    pub fn load(&self) -> anyhow::Result<Settings> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(Settings::new());
        }
        parser::parse_settings(&self.config_path)
    }

    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let content = parser::to_toml(settings)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}

//! Configuration schema for config.toml
//!
//! ```toml
//! default_profile = "default"
//!
//! [catalog]
//! url = "https://catalog.example.com/v1"
//!
//! [validation]
//! endpoint = "https://telemetry.example.com/query"
//! timeout_secs = 300
//!
//! [bundle]
//! infra_agent = "infrastructure-agent-installer"
//!
//! [profiles.default]
//! license_key = "..."
//! account_id = 12345
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_INFRA_AGENT_RECIPE: &str = "infrastructure-agent-installer";
pub const DEFAULT_LOGGING_RECIPE: &str = "logs-integration";

const DEFAULT_PROFILE: &str = "default";
const ENV_PROFILE: &str = "AGENTUP_PROFILE";
const ENV_LICENSE_KEY: &str = "AGENTUP_LICENSE_KEY";
const ENV_ACCOUNT_ID: &str = "AGENTUP_ACCOUNT_ID";
const ENV_API_KEY: &str = "AGENTUP_API_KEY";
const ENV_REGION: &str = "AGENTUP_REGION";

/// Root configuration structure for config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Profile used when none is selected explicitly
    #[serde(default)]
    pub default_profile: Option<String>,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub validation: ValidationSettings,

    #[serde(default)]
    pub bundle: BundleSettings,

    /// Credential profiles by name
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

/// Backend recipe catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Post-install telemetry validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_validation_endpoint")]
    pub endpoint: String,

    /// Wall-clock budget for one recipe's validation
    #[serde(default = "default_validation_timeout")]
    pub timeout_secs: u64,

    /// Delay between polls
    #[serde(default = "default_validation_interval")]
    pub interval_secs: u64,
}

impl ValidationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            endpoint: default_validation_endpoint(),
            timeout_secs: default_validation_timeout(),
            interval_secs: default_validation_interval(),
        }
    }
}

/// Which recipes form the always-considered bundle, and how they relate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSettings {
    #[serde(default = "default_infra_agent")]
    pub infra_agent: String,

    #[serde(default = "default_logging")]
    pub logging: String,

    /// Every other recipe implicitly depends on the infra agent
    #[serde(default = "default_true")]
    pub infra_is_root: bool,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            infra_agent: default_infra_agent(),
            logging: default_logging(),
            infra_is_root: true,
        }
    }
}

/// Credentials for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub license_key: String,

    #[serde(default)]
    pub account_id: Option<u64>,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub region: String,
}

impl Profile {
    /// Apply `AGENTUP_*` overrides on top of the stored values.
    pub fn with_env_overrides<F>(mut self, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(license_key) = lookup(ENV_LICENSE_KEY) {
            self.license_key = license_key;
        }
        if let Some(account_id) = lookup(ENV_ACCOUNT_ID) {
            let parsed = account_id.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("{ENV_ACCOUNT_ID} must be a number, got '{account_id}'")
            })?;
            self.account_id = Some(parsed);
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.api_key = api_key;
        }
        if let Some(region) = lookup(ENV_REGION) {
            self.region = region;
        }
        Ok(self)
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.catalog.url)
            .map_err(|e| anyhow::anyhow!("Invalid catalog url '{}': {}", self.catalog.url, e))?;
        url::Url::parse(&self.validation.endpoint).map_err(|e| {
            anyhow::anyhow!(
                "Invalid validation endpoint '{}': {}",
                self.validation.endpoint,
                e
            )
        })?;
        if self.validation.interval_secs == 0 {
            anyhow::bail!("validation.interval_secs must be greater than zero");
        }
        if self.bundle.infra_agent.trim().is_empty() {
            anyhow::bail!("bundle.infra_agent must not be empty");
        }
        if let Some(name) = &self.default_profile
            && !self.profiles.contains_key(name)
        {
            anyhow::bail!("default_profile '{}' is not defined under [profiles]", name);
        }
        Ok(())
    }

    /// Name of the profile to use: explicit choice, then `AGENTUP_PROFILE`,
    /// then `default_profile`, then "default".
    pub fn active_profile_name<F>(&self, requested: Option<&str>, env: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        requested
            .map(str::to_string)
            .or_else(|| env(ENV_PROFILE).filter(|v| !v.is_empty()))
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Resolve the active profile with environment overrides applied.
    ///
    /// A profile that does not exist resolves to an empty one so that the
    /// environment alone can supply credentials; the missing license key is
    /// reported per recipe.
    pub fn active_profile<F>(&self, requested: Option<&str>, env: F) -> anyhow::Result<Profile>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = self.active_profile_name(requested, &env);
        let profile = match self.profiles.get(&name) {
            Some(profile) => profile.clone(),
            None => {
                if requested.is_some() {
                    anyhow::bail!("Profile '{}' is not defined", name);
                }
                tracing::debug!(profile = %name, "profile not found in config, using environment");
                Profile::default()
            }
        };
        profile.with_env_overrides(env)
    }
}

fn default_catalog_url() -> String {
    "https://catalog.agentup.dev/v1".to_string()
}

fn default_validation_endpoint() -> String {
    "https://telemetry.agentup.dev/v1/query".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_validation_timeout() -> u64 {
    300
}

fn default_validation_interval() -> u64 {
    5
}

fn default_infra_agent() -> String {
    DEFAULT_INFRA_AGENT_RECIPE.to_string()
}

fn default_logging() -> String {
    DEFAULT_LOGGING_RECIPE.to_string()
}

fn default_true() -> bool {
    true
}

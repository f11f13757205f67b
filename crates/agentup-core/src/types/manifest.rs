use serde::{Deserialize, Serialize};

use super::InstallTargetType;

/// Snapshot of host facts, produced once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryManifest {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    pub platform_family: String,
    pub platform_version: String,
    pub kernel_arch: String,
    pub kernel_version: String,
}

impl DiscoveryManifest {
    /// The install target type this host represents.
    ///
    /// Discovery only inspects the machine itself, so every manifest
    /// describes a host.
    pub fn target_type(&self) -> InstallTargetType {
        InstallTargetType::Host
    }
}

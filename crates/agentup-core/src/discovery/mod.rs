//! Host discovery: produces the manifest used to filter recommendations and
//! seed recipe variables.

use sysinfo::System;

use crate::types::DiscoveryManifest;

/// Produces a [`DiscoveryManifest`] for the current run.
pub trait Discoverer: Send + Sync {
    fn discover(&self) -> anyhow::Result<DiscoveryManifest>;
}

/// Discovers facts about the machine the installer runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDiscoverer;

impl SystemDiscoverer {
    pub fn new() -> Self {
        Self
    }
}

impl Discoverer for SystemDiscoverer {
    fn discover(&self) -> anyhow::Result<DiscoveryManifest> {
        let hostname = System::host_name()
            .ok_or_else(|| anyhow::anyhow!("Could not determine hostname"))?;
        let platform = System::distribution_id();

        let manifest = DiscoveryManifest {
            hostname,
            os: std::env::consts::OS.to_string(),
            platform_family: platform_family(&platform).to_string(),
            platform,
            platform_version: System::os_version().unwrap_or_default(),
            kernel_arch: std::env::consts::ARCH.to_string(),
            kernel_version: System::kernel_version().unwrap_or_default(),
        };

        tracing::debug!(
            hostname = %manifest.hostname,
            os = %manifest.os,
            platform = %manifest.platform,
            platform_version = %manifest.platform_version,
            "discovered host"
        );

        Ok(manifest)
    }
}

/// Map a distribution id onto the family its packaging follows.
pub fn platform_family(platform: &str) -> &str {
    match platform {
        "debian" | "ubuntu" | "linuxmint" | "raspbian" | "pop" => "debian",
        "rhel" | "centos" | "fedora" | "amzn" | "rocky" | "almalinux" | "ol" => "rhel",
        "sles" | "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => "suse",
        "arch" | "manjaro" | "endeavouros" => "arch",
        "alpine" => "alpine",
        other => other,
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DiscoveryManifest;

/// An install procedure fetched from the catalog or loaded from a recipe file.
///
/// Recipes are immutable value objects once fetched; every run attempt
/// against a recipe produces a status transition, never a new recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Names of recipes that must succeed before this one runs.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub install_targets: Vec<InstallTarget>,
    #[serde(default)]
    pub input_vars: Vec<VariableConfig>,
    #[serde(default)]
    pub vars: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub validation_query: String,
    /// Install steps in the step runner's task format; opaque to the installer.
    #[serde(default)]
    pub install: serde_yaml::Value,
}

impl Recipe {
    /// A bare recipe carrying only its identity.
    ///
    /// Used to report on recipes that were never fetched (skipped by flag or
    /// failed to load).
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            ..Self::default()
        }
    }

    /// Human-facing label, falling back to the recipe name.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn has_validation(&self) -> bool {
        !self.validation_query.trim().is_empty()
    }

    /// Whether this recipe can be installed on the discovered host.
    ///
    /// A recipe without declared targets applies to the host.
    pub fn matches_manifest(&self, manifest: &DiscoveryManifest) -> bool {
        if self.install_targets.is_empty() {
            return manifest.target_type() == InstallTargetType::Host;
        }
        self.install_targets
            .iter()
            .any(|target| target.matches(manifest))
    }
}

/// Kind of entity a recipe installs onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallTargetType {
    #[default]
    #[serde(alias = "HOST")]
    Host,
    #[serde(alias = "APPLICATION")]
    Application,
    #[serde(alias = "CLOUD")]
    Cloud,
    #[serde(alias = "KUBERNETES")]
    Kubernetes,
}

/// Install target descriptor; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallTarget {
    #[serde(rename = "type", default)]
    pub target_type: InstallTargetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_arch: Option<String>,
}

impl InstallTarget {
    pub fn host() -> Self {
        Self::default()
    }

    pub fn of_type(target_type: InstallTargetType) -> Self {
        Self {
            target_type,
            ..Self::default()
        }
    }

    pub fn matches(&self, manifest: &DiscoveryManifest) -> bool {
        self.target_type == manifest.target_type()
            && field_matches(&self.os, &manifest.os)
            && field_matches(&self.platform, &manifest.platform)
            && field_matches(&self.platform_family, &manifest.platform_family)
            && field_matches(&self.platform_version, &manifest.platform_version)
            && field_matches(&self.kernel_arch, &manifest.kernel_arch)
    }
}

fn field_matches(expected: &Option<String>, actual: &str) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => expected.eq_ignore_ascii_case(actual),
        _ => true,
    }
}

/// A user-supplied input variable declared by a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub secret: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_host() -> DiscoveryManifest {
        DiscoveryManifest {
            hostname: "web-1".to_string(),
            os: "linux".to_string(),
            platform: "ubuntu".to_string(),
            platform_family: "debian".to_string(),
            platform_version: "22.04".to_string(),
            kernel_arch: "x86_64".to_string(),
            kernel_version: "5.15.0".to_string(),
        }
    }

    #[test]
    fn recipe_without_targets_applies_to_host() {
        let recipe = Recipe::named("infra");
        assert!(recipe.matches_manifest(&linux_host()));
    }

    #[test]
    fn application_target_does_not_match_host() {
        let recipe = Recipe {
            install_targets: vec![InstallTarget::of_type(InstallTargetType::Application)],
            ..Recipe::named("java")
        };
        assert!(!recipe.matches_manifest(&linux_host()));
    }

    #[test]
    fn target_fields_compare_case_insensitively() {
        let target = InstallTarget {
            os: Some("Linux".to_string()),
            platform_family: Some("DEBIAN".to_string()),
            ..InstallTarget::host()
        };
        assert!(target.matches(&linux_host()));

        let windows = InstallTarget {
            os: Some("windows".to_string()),
            ..InstallTarget::host()
        };
        assert!(!windows.matches(&linux_host()));
    }

    #[test]
    fn any_matching_target_is_enough() {
        let recipe = Recipe {
            install_targets: vec![
                InstallTarget::of_type(InstallTargetType::Kubernetes),
                InstallTarget {
                    platform: Some("ubuntu".to_string()),
                    ..InstallTarget::host()
                },
            ],
            ..Recipe::named("nginx")
        };
        assert!(recipe.matches_manifest(&linux_host()));
    }

    #[test]
    fn label_falls_back_to_name() {
        let mut recipe = Recipe::named("mysql");
        recipe.display_name.clear();
        assert_eq!(recipe.label(), "mysql");
    }

    #[test]
    fn target_type_accepts_upper_case() {
        let target: InstallTarget = serde_yaml::from_str("type: APPLICATION").unwrap();
        assert_eq!(target.target_type, InstallTargetType::Application);
    }
}

//! Recipe file document format.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{InstallTarget, Recipe, VariableConfig};

/// On-disk / over-the-wire recipe document.
///
/// ```yaml
/// name: mysql-open-source-integration
/// displayName: MySQL Integration
/// dependencies: [infrastructure-agent-installer]
/// installTargets:
///   - type: host
///     os: linux
/// inputVars:
///   - name: MYSQL_PASSWORD
///     prompt: MySQL password
///     secret: true
/// vars:
///   PORT: 3306
/// validationNrql: "SELECT count(*) FROM MysqlSample WHERE hostname = '{{.HOSTNAME}}'"
/// install:
///   version: "3"
///   tasks:
///     default:
///       cmds:
///         - echo installing
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFile {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub install_targets: Vec<InstallTarget>,
    #[serde(default)]
    pub input_vars: Vec<VariableConfig>,
    #[serde(default)]
    pub vars: BTreeMap<String, serde_yaml::Value>,
    #[serde(default, alias = "validationQuery")]
    pub validation_nrql: String,
    #[serde(default)]
    pub install: serde_yaml::Value,
}

impl RecipeFile {
    /// Parse a YAML (or JSON) recipe document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let file: RecipeFile =
            serde_yaml::from_str(content).context("Failed to parse recipe file")?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Recipe file is missing a name");
        }
        for input in &self.input_vars {
            if input.name.trim().is_empty() {
                anyhow::bail!("Recipe '{}' declares an input variable without a name", self.name);
            }
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize recipe file")
    }
}

impl From<RecipeFile> for Recipe {
    fn from(file: RecipeFile) -> Self {
        let display_name = if file.display_name.is_empty() {
            file.name.clone()
        } else {
            file.display_name
        };
        Recipe {
            name: file.name,
            display_name,
            description: file.description,
            keywords: file.keywords,
            dependencies: file.dependencies,
            install_targets: file.install_targets,
            input_vars: file.input_vars,
            vars: file.vars,
            validation_query: file.validation_nrql,
            install: file.install,
        }
    }
}

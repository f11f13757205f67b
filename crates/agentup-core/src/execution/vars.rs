//! Variable resolution: merges system facts, profile credentials, recipe
//! static vars and operator input into one [`RecipeVars`] per recipe.
//!
//! Sources are applied in that order; a later source overwrites keys set by
//! an earlier one.

use std::sync::Arc;

use crate::config::Profile;
use crate::error::InstallError;
use crate::types::{DiscoveryManifest, Recipe, RecipeVars, VariableConfig};
use crate::ux::Prompter;

pub const LICENSE_KEY: &str = "LICENSE_KEY";
pub const ACCOUNT_ID: &str = "ACCOUNT_ID";
pub const API_KEY: &str = "API_KEY";
pub const REGION: &str = "REGION";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct VariableResolver {
    profile: Profile,
    prompter: Arc<dyn Prompter>,
    env: EnvLookup,
}

impl std::fmt::Debug for VariableResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableResolver").finish_non_exhaustive()
    }
}

impl VariableResolver {
    /// Resolver reading input variables from the process environment.
    pub fn new(profile: Profile, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            profile,
            prompter,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    pub fn resolve(
        &self,
        manifest: &DiscoveryManifest,
        recipe: &Recipe,
        assume_yes: bool,
    ) -> Result<RecipeVars, InstallError> {
        let mut vars = vars_from_system(manifest);
        vars.extend(vars_from_profile(&self.profile)?);
        vars.extend(vars_from_recipe(recipe));
        vars.extend(self.vars_from_input(&recipe.input_vars, assume_yes)?);
        Ok(vars)
    }

    fn vars_from_input(
        &self,
        inputs: &[VariableConfig],
        assume_yes: bool,
    ) -> Result<RecipeVars, InstallError> {
        let mut vars = RecipeVars::new();

        for input in inputs {
            if let Some(value) = (self.env)(&input.name).filter(|v| !v.is_empty()) {
                vars.insert(input.name.clone(), value);
                continue;
            }

            let value = if assume_yes {
                if input.default.is_empty() {
                    return Err(InstallError::MissingRequiredInput {
                        name: input.name.clone(),
                    });
                }
                tracing::debug!(
                    name = %input.name,
                    "input variable not set in environment, using default"
                );
                input.default.clone()
            } else {
                tracing::debug!(
                    name = %input.name,
                    "input variable not set in environment, prompting"
                );
                let default = (!input.default.is_empty()).then_some(input.default.as_str());
                self.prompter
                    .prompt_text(&prompt_label(input), default, input.secret)
                    .map_err(|e| InstallError::PromptFailure(format!("{e:#}")))?
            };

            vars.insert(input.name.clone(), value);
        }

        Ok(vars)
    }
}

pub fn vars_from_system(manifest: &DiscoveryManifest) -> RecipeVars {
    RecipeVars::from([
        ("HOSTNAME".to_string(), manifest.hostname.clone()),
        ("OS".to_string(), manifest.os.clone()),
        ("PLATFORM".to_string(), manifest.platform.clone()),
        ("PLATFORM_FAMILY".to_string(), manifest.platform_family.clone()),
        ("PLATFORM_VERSION".to_string(), manifest.platform_version.clone()),
        ("KERNEL_ARCH".to_string(), manifest.kernel_arch.clone()),
        ("KERNEL_VERSION".to_string(), manifest.kernel_version.clone()),
    ])
}

/// Credentials from the active profile; a blank license key is fatal.
pub fn vars_from_profile(profile: &Profile) -> Result<RecipeVars, InstallError> {
    if profile.license_key.trim().is_empty() {
        return Err(InstallError::MissingCredential("license key"));
    }

    Ok(RecipeVars::from([
        (LICENSE_KEY.to_string(), profile.license_key.clone()),
        (
            ACCOUNT_ID.to_string(),
            profile.account_id.map(|id| id.to_string()).unwrap_or_default(),
        ),
        (API_KEY.to_string(), profile.api_key.clone()),
        (REGION.to_string(), profile.region.clone()),
    ]))
}

/// Static vars rendered as text; structured values become YAML.
pub fn vars_from_recipe(recipe: &Recipe) -> RecipeVars {
    recipe
        .vars
        .iter()
        .map(|(name, value)| (name.clone(), value_to_text(value)))
        .collect()
}

fn value_to_text(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end_matches('\n').to_string())
            .unwrap_or_default(),
    }
}

fn prompt_label(input: &VariableConfig) -> String {
    if input.prompt.is_empty() {
        format!("value for {} required", input.name)
    } else {
        format!("{}: {}", input.name, input.prompt)
    }
}

//! Recipe executor: resolves variables and runs a recipe's install steps.

use std::io::Write;

use super::runner::{OutputMode, StepError, StepRunner};
use super::vars::VariableResolver;
use crate::error::InstallError;
use crate::types::{DiscoveryManifest, Recipe, RecipeVars};

/// Prepares and executes one recipe.
pub trait RecipeExecutor: Send + Sync {
    /// Resolve the recipe's variable set. May prompt.
    fn prepare(
        &self,
        manifest: &DiscoveryManifest,
        recipe: &Recipe,
        assume_yes: bool,
    ) -> Result<RecipeVars, InstallError>;

    fn execute(
        &self,
        manifest: &DiscoveryManifest,
        recipe: &Recipe,
        vars: &RecipeVars,
    ) -> Result<(), InstallError>;
}

/// Writes the install steps to a temporary task file and hands it to a
/// [`StepRunner`].
pub struct TaskRecipeExecutor {
    resolver: VariableResolver,
    runner: Box<dyn StepRunner>,
    global_vars: RecipeVars,
}

impl std::fmt::Debug for TaskRecipeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecipeExecutor")
            .field("resolver", &self.resolver)
            .field("global_vars", &self.global_vars.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl TaskRecipeExecutor {
    pub fn new(resolver: VariableResolver, runner: Box<dyn StepRunner>) -> Self {
        Self {
            resolver,
            runner,
            global_vars: RecipeVars::new(),
        }
    }

    /// Variables applied to every task, beneath the recipe's own.
    pub fn with_global_vars(mut self, vars: RecipeVars) -> Self {
        self.global_vars = vars;
        self
    }

    fn write_task_file(recipe: &Recipe) -> Result<tempfile::NamedTempFile, StepError> {
        let content = serde_yaml::to_string(&recipe.install)
            .map_err(|e| StepError::Serialize(e.to_string()))?;

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", file_stem(&recipe.name)))
            .suffix(".yml")
            .tempfile()
            .map_err(|e| StepError::Serialize(e.to_string()))?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StepError::Serialize(e.to_string()))?;
        Ok(file)
    }
}

impl RecipeExecutor for TaskRecipeExecutor {
    fn prepare(
        &self,
        manifest: &DiscoveryManifest,
        recipe: &Recipe,
        assume_yes: bool,
    ) -> Result<RecipeVars, InstallError> {
        self.resolver.resolve(manifest, recipe, assume_yes)
    }

    fn execute(
        &self,
        _manifest: &DiscoveryManifest,
        recipe: &Recipe,
        vars: &RecipeVars,
    ) -> Result<(), InstallError> {
        let failure = |source| InstallError::ExecutionFailure {
            recipe: recipe.name.clone(),
            source,
        };

        // Removed when dropped, on every exit path.
        let task_file = Self::write_task_file(recipe).map_err(failure)?;

        let mut task_vars = self.global_vars.clone();
        task_vars.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mode = OutputMode::for_current_level();
        tracing::debug!(
            recipe = %recipe.name,
            task_file = %task_file.path().display(),
            mode = ?mode,
            "executing recipe"
        );

        match self.runner.run(task_file.path(), &task_vars, mode) {
            Ok(output) => {
                if !output.stdout.is_empty() {
                    tracing::trace!(
                        recipe = %recipe.name,
                        stdout = %output.stdout,
                        "recipe output"
                    );
                }
                Ok(())
            }
            Err(e) => {
                if mode == OutputMode::Capture
                    && let Some(stderr) = e.stderr()
                {
                    tracing::error!(
                        recipe = %recipe.name,
                        stderr = %single_line(stderr),
                        "recipe stderr"
                    );
                }
                Err(failure(e))
            }
        }
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

//! Error taxonomy for recipe installation.
//!
//! Per-recipe variants are caught at the installer's per-recipe boundary and
//! turned into a FAILED broadcast. Run-level variants are what
//! [`RecipeInstaller::install`](crate::install::RecipeInstaller::install)
//! hands back to the caller.

use thiserror::Error;

use crate::execution::StepError;

#[derive(Debug, Error)]
pub enum InstallError {
    /// A required profile value is absent.
    #[error("missing credential: {0} is not set in the active profile")]
    MissingCredential(&'static str),

    /// Non-interactive run and no value available for an input variable.
    #[error("no value provided for input variable {name} and no default is declared")]
    MissingRequiredInput { name: String },

    /// Catalog unreachable or recipe not found.
    #[error("failed to fetch recipe {name}: {reason}")]
    FetchFailure { name: String, reason: String },

    /// The step runner failed or could not start.
    #[error("recipe {recipe} failed to execute: {source}")]
    ExecutionFailure {
        recipe: String,
        #[source]
        source: StepError,
    },

    /// Telemetry did not appear in time.
    #[error("validation of recipe {recipe} failed: {reason}")]
    ValidationFailure { recipe: String, reason: String },

    /// The interactive input channel closed or errored.
    #[error("prompt failed: {0}")]
    PromptFailure(String),

    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Every bundle and explicit recipe failed to load, nothing to install.
    #[error("no recipes could be resolved: {}", .failed.join(", "))]
    NoRecipesResolved { failed: Vec<String> },

    #[error("one or more recipes failed to install: {}", .failed.join(", "))]
    RecipesFailed { failed: Vec<String> },

    #[error("installation canceled{}", canceled_suffix(.failed))]
    Canceled { failed: Vec<String> },
}

fn canceled_suffix(failed: &[String]) -> String {
    if failed.is_empty() {
        String::new()
    } else {
        format!(" after failures in: {}", failed.join(", "))
    }
}

//! Post-install validation: confirm telemetry is flowing for a recipe.

mod polling;

pub use polling::{HttpTelemetryClient, PollingValidator, TelemetryQuery};

use crate::types::{Recipe, RecipeVars};

/// Checks that an installed recipe produces data.
pub trait RecipeValidator: Send + Sync {
    fn validate(&self, recipe: &Recipe, vars: &RecipeVars) -> anyhow::Result<()>;
}

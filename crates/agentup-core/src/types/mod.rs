//! Shared domain types used across discovery, execution and orchestration.

mod manifest;
mod recipe;
mod status;

pub use manifest::DiscoveryManifest;
pub use recipe::{InstallTarget, InstallTargetType, Recipe, VariableConfig};
pub use status::InstallStatus;

use std::collections::BTreeMap;

/// Final merged variable set for one recipe.
pub type RecipeVars = BTreeMap<String, String>;

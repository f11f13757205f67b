//! Agentup Core Library
//!
//! Provides the domain logic for installing telemetry agents from declarative
//! recipes: discovery, catalog access, variable resolution, step execution,
//! post-install validation and status reporting.

pub mod config;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod install;
pub mod recipes;
pub mod types;
pub mod ux;
pub mod validation;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{BundleSettings, ConfigStore, Profile, Settings};

    // Errors
    pub use crate::error::InstallError;

    // Domain types
    pub use crate::types::{
        DiscoveryManifest, InstallStatus, InstallTarget, InstallTargetType, Recipe, RecipeVars,
        VariableConfig,
    };

    // Collaborators
    pub use crate::discovery::{Discoverer, SystemDiscoverer};
    pub use crate::execution::{
        RecipeExecutor, ShellStepRunner, StatusEvent, StatusReporter, StatusRollup, StepRunner,
        TaskRecipeExecutor, VariableResolver,
    };
    pub use crate::recipes::{CatalogClient, RecipeFetcher, RecipeFile, RecipeFileFetcher};
    pub use crate::ux::{NoopProgress, ProgressIndicator, Prompter};
    pub use crate::validation::{PollingValidator, RecipeValidator};

    // Orchestration
    pub use crate::install::{InstallerContext, InstallerServices, RecipeInstaller};
}

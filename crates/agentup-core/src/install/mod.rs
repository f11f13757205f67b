//! Installation orchestration.

mod context;
mod installer;
mod plan;

pub use context::InstallerContext;
pub use installer::{InstallerServices, RecipeInstaller};

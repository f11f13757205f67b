//! Per-recipe execution: variable resolution, step running and status
//! broadcasting.

mod executor;
mod reporters;
mod runner;
mod status;
pub mod template;
pub mod vars;

pub use executor::{RecipeExecutor, TaskRecipeExecutor};
pub use reporters::{LogStatusReporter, StatusFileReporter};
pub use runner::{OutputMode, ShellStepRunner, StepError, StepOutput, StepRunner};
pub use status::{RecipeStatusEvent, StatusEvent, StatusEventKind, StatusReporter, StatusRollup};
pub use vars::VariableResolver;

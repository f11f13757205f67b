//! Lifecycle events and the rollup that fans them out to reporters.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::InstallError;
use crate::types::{InstallStatus, Recipe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusEventKind {
    RecipesAvailable,
    RecipeRecommended,
    RecipeInstalling,
    RecipeInstalled,
    RecipeFailed,
    RecipeSkipped,
    RecipeCanceled,
    Complete,
}

/// Status change of a single recipe.
#[derive(Debug, Clone, Copy)]
pub struct RecipeStatusEvent<'a> {
    pub recipe: &'a Recipe,
    pub status: InstallStatus,
    pub error: Option<&'a InstallError>,
}

#[derive(Debug, Clone, Copy)]
pub enum StatusEvent<'a> {
    /// Every candidate recipe of the run, broadcast once.
    RecipesAvailable(&'a [Recipe]),
    Recipe(RecipeStatusEvent<'a>),
    /// End of the run with its aggregate error, broadcast once.
    Complete(Option<&'a InstallError>),
}

impl StatusEvent<'_> {
    pub fn kind(&self) -> StatusEventKind {
        match self {
            StatusEvent::RecipesAvailable(_) => StatusEventKind::RecipesAvailable,
            StatusEvent::Complete(_) => StatusEventKind::Complete,
            StatusEvent::Recipe(event) => match event.status {
                InstallStatus::Available => StatusEventKind::RecipesAvailable,
                InstallStatus::Recommended => StatusEventKind::RecipeRecommended,
                InstallStatus::Installing => StatusEventKind::RecipeInstalling,
                InstallStatus::Installed => StatusEventKind::RecipeInstalled,
                InstallStatus::Failed => StatusEventKind::RecipeFailed,
                InstallStatus::Skipped => StatusEventKind::RecipeSkipped,
                InstallStatus::Canceled => StatusEventKind::RecipeCanceled,
            },
        }
    }
}

/// Observer of installer lifecycle events.
pub trait StatusReporter: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn report(&self, event: &StatusEvent<'_>) -> anyhow::Result<()>;
}

/// Ordered list of reporters.
///
/// Dispatch is synchronous and in registration order. A reporter that errors
/// or panics is logged and the event still reaches the remaining reporters.
#[derive(Default)]
pub struct StatusRollup {
    reporters: Vec<Box<dyn StatusReporter>>,
}

impl std::fmt::Debug for StatusRollup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.reporters.iter().map(|r| r.name()))
            .finish()
    }
}

impl StatusRollup {
    pub fn new(reporters: Vec<Box<dyn StatusReporter>>) -> Self {
        Self { reporters }
    }

    pub fn with_reporter(mut self, reporter: impl StatusReporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn broadcast(&self, event: &StatusEvent<'_>) {
        for reporter in &self.reporters {
            match catch_unwind(AssertUnwindSafe(|| reporter.report(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    reporter = reporter.name(),
                    event = ?event.kind(),
                    error = %format!("{:#}", e),
                    "status reporter failed"
                ),
                Err(payload) => tracing::error!(
                    reporter = reporter.name(),
                    event = ?event.kind(),
                    panic = %panic_message(payload.as_ref()),
                    "status reporter panicked"
                ),
            }
        }
    }

    pub fn available(&self, recipes: &[Recipe]) {
        self.broadcast(&StatusEvent::RecipesAvailable(recipes));
    }

    pub fn complete(&self, error: Option<&InstallError>) {
        self.broadcast(&StatusEvent::Complete(error));
    }

    pub fn recipe_status(
        &self,
        recipe: &Recipe,
        status: InstallStatus,
        error: Option<&InstallError>,
    ) {
        self.broadcast(&StatusEvent::Recipe(RecipeStatusEvent {
            recipe,
            status,
            error,
        }));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

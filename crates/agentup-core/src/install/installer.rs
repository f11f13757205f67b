//! The recipe installer: discovery, selection, execution and validation of
//! every recipe in a run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::context::InstallerContext;
use super::plan;
use crate::config::BundleSettings;
use crate::discovery::Discoverer;
use crate::error::InstallError;
use crate::execution::{RecipeExecutor, StatusRollup};
use crate::recipes::{RecipeFetcher, RecipeFileFetcher, recipe_from_location};
use crate::types::{DiscoveryManifest, InstallStatus, Recipe};
use crate::ux::{ProgressIndicator, Prompter};
use crate::validation::RecipeValidator;

const CONFIRM_RECOMMENDATIONS: &str =
    "Additional integrations are available for this host. Would you like to install them?";
const SELECT_RECOMMENDATIONS: &str = "Select the integrations to install";

/// Collaborators the installer drives.
pub struct InstallerServices {
    pub discoverer: Box<dyn Discoverer>,
    pub recipe_fetcher: Box<dyn RecipeFetcher>,
    pub file_fetcher: Box<dyn RecipeFileFetcher>,
    pub executor: Box<dyn RecipeExecutor>,
    pub validator: Box<dyn RecipeValidator>,
    pub status: StatusRollup,
    pub prompter: Arc<dyn Prompter>,
    pub progress: Box<dyn ProgressIndicator>,
    pub bundle: BundleSettings,
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for InstallerServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerServices")
            .field("status", &self.status)
            .field("bundle", &self.bundle)
            .finish_non_exhaustive()
    }
}

/// Orchestrates one installation run.
#[derive(Debug)]
pub struct RecipeInstaller {
    context: InstallerContext,
    services: InstallerServices,
}

/// Result of fetching one bundle or explicit recipe.
type Fetched = (String, anyhow::Result<Recipe>);

/// Recipes gathered before selection.
struct Candidates {
    infra: Option<Recipe>,
    logging: Option<Recipe>,
    explicit: Vec<Recipe>,
    recommendations: Vec<Recipe>,
    /// Names of bundle or explicit recipes that failed to load.
    fetch_failures: Vec<(String, InstallError)>,
    attempted: usize,
}

impl Candidates {
    /// Keep a fetched recipe, or record why it could not be loaded.
    fn accept(&mut self, (name, result): Fetched) -> Option<Recipe> {
        self.attempted += 1;
        match result {
            Ok(recipe) => Some(recipe),
            Err(e) => {
                let reason = format!("{:#}", e);
                self.fetch_failures
                    .push((name.clone(), InstallError::FetchFailure { name, reason }));
                None
            }
        }
    }

    /// Every candidate once, in install order.
    fn all(&self) -> Vec<Recipe> {
        let mut seen = HashSet::new();
        self.infra
            .iter()
            .chain(self.logging.iter())
            .chain(self.explicit.iter())
            .chain(self.recommendations.iter())
            .filter(|recipe| seen.insert(recipe.name.as_str()))
            .cloned()
            .collect()
    }
}

/// Per-run bookkeeping.
#[derive(Default)]
struct RunState {
    statuses: HashMap<String, InstallStatus>,
    /// FAILED or cascade-SKIPPED recipes; their dependents are skipped.
    blocked: HashSet<String>,
    failed: Vec<String>,
    canceled: bool,
}

impl RunState {
    fn record_failure(&mut self, name: &str) {
        self.blocked.insert(name.to_string());
        if !self.failed.iter().any(|f| f == name) {
            self.failed.push(name.to_string());
        }
    }
}

/// How a single recipe attempt ended, when it did not succeed.
enum Interrupted {
    Failed(InstallError),
    Canceled,
}

impl From<InstallError> for Interrupted {
    fn from(error: InstallError) -> Self {
        Interrupted::Failed(error)
    }
}

impl RecipeInstaller {
    pub fn new(context: InstallerContext, services: InstallerServices) -> Self {
        Self { context, services }
    }

    /// Run the installation. COMPLETE is broadcast exactly once, carrying the
    /// same error this returns.
    pub fn install(&self) -> Result<(), InstallError> {
        let mut state = RunState::default();
        let result = self.run(&mut state);
        self.services.status.complete(result.as_ref().err());
        result
    }

    fn run(&self, state: &mut RunState) -> Result<(), InstallError> {
        let manifest = self.discover()?;
        let bundle = &self.services.bundle;

        for name in self.excluded_bundle_names() {
            tracing::debug!(recipe = %name, "bundle recipe excluded by flags");
            self.transition(state, &Recipe::named(name), InstallStatus::Skipped, None);
        }

        let candidates = self.gather(&manifest);
        for (name, error) in &candidates.fetch_failures {
            tracing::error!(recipe = %name, error = %error, "failed to fetch recipe");
            self.transition(state, &Recipe::named(name), InstallStatus::Failed, Some(error));
            state.record_failure(name);
        }

        if candidates.attempted > 0
            && candidates.fetch_failures.len() == candidates.attempted
            && candidates.recommendations.is_empty()
        {
            return Err(InstallError::NoRecipesResolved {
                failed: state.failed.clone(),
            });
        }

        let all = candidates.all();
        for recipe in &all {
            state
                .statuses
                .entry(recipe.name.clone())
                .or_insert(InstallStatus::Available);
        }
        self.services.status.available(&all);
        for recipe in &candidates.recommendations {
            self.transition(state, recipe, InstallStatus::Recommended, None);
        }

        let Candidates {
            infra,
            logging,
            explicit,
            recommendations,
            ..
        } = candidates;
        let chosen = self.select_recommendations(state, recommendations);

        let mut seen = HashSet::new();
        let queue: Vec<Recipe> = infra
            .into_iter()
            .chain(logging)
            .chain(explicit)
            .chain(chosen)
            .filter(|recipe| seen.insert(recipe.name.clone()))
            .collect();
        let queue = plan::install_order(queue, bundle);

        self.process(state, &manifest, &queue);

        if state.canceled {
            Err(InstallError::Canceled {
                failed: state.failed.clone(),
            })
        } else if !state.failed.is_empty() {
            Err(InstallError::RecipesFailed {
                failed: state.failed.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Bundle recipes the flags leave out of this run.
    fn excluded_bundle_names(&self) -> Vec<String> {
        let bundle = &self.services.bundle;
        let mut names = Vec::new();
        if self.context.skip_infra_install {
            names.push(bundle.infra_agent.clone());
        }
        if !self.context.should_install_logging() {
            names.push(bundle.logging.clone());
        }
        names.retain(|name| !self.context.recipe_names.contains(name));
        names
    }

    fn discover(&self) -> Result<DiscoveryManifest, InstallError> {
        if self.context.skip_discovery {
            tracing::debug!("discovery skipped");
            return Ok(DiscoveryManifest::default());
        }
        let manifest = self
            .services
            .discoverer
            .discover()
            .map_err(|e| InstallError::Discovery(format!("{:#}", e)))?;
        tracing::info!(
            hostname = %manifest.hostname,
            platform = %manifest.platform,
            arch = %manifest.kernel_arch,
            "host discovered"
        );
        Ok(manifest)
    }

    /// Fetch bundle, explicit and recommended recipes concurrently.
    fn gather(&self, manifest: &DiscoveryManifest) -> Candidates {
        let bundle = &self.services.bundle;
        let fetcher = self.services.recipe_fetcher.as_ref();
        let file_fetcher = self.services.file_fetcher.as_ref();

        let (infra, logging, explicit, recommendations) = std::thread::scope(|scope| {
            let infra = (!self.context.skip_infra_install).then(|| {
                let name = bundle.infra_agent.as_str();
                (name.to_string(), scope.spawn(move || fetcher.fetch_recipe(name)))
            });
            let logging = self.context.should_install_logging().then(|| {
                let name = bundle.logging.as_str();
                (name.to_string(), scope.spawn(move || fetcher.fetch_recipe(name)))
            });

            let mut explicit = Vec::new();
            for path in &self.context.recipe_paths {
                explicit.push((
                    path.clone(),
                    scope.spawn(move || recipe_from_location(file_fetcher, path)),
                ));
            }
            for name in &self.context.recipe_names {
                explicit.push((name.clone(), scope.spawn(move || fetcher.fetch_recipe(name))));
            }

            let recommendations = self
                .context
                .should_fetch_recommendations()
                .then(|| scope.spawn(move || fetcher.fetch_recommendations(manifest)));

            (
                infra.map(join_fetch),
                logging.map(join_fetch),
                explicit.into_iter().map(join_fetch).collect::<Vec<_>>(),
                recommendations.map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow::anyhow!("recommendation fetch panicked")))
                }),
            )
        });

        let mut candidates = Candidates {
            infra: None,
            logging: None,
            explicit: Vec::new(),
            recommendations: Vec::new(),
            fetch_failures: Vec::new(),
            attempted: 0,
        };

        if let Some(fetched) = infra {
            candidates.infra = candidates.accept(fetched);
        }
        if let Some(fetched) = logging {
            candidates.logging = candidates.accept(fetched);
        }
        for fetched in explicit {
            if let Some(recipe) = candidates.accept(fetched) {
                candidates.explicit.push(recipe);
            }
        }

        if let Some(result) = recommendations {
            match result {
                Ok(recipes) => {
                    let taken: HashSet<String> = candidates
                        .infra
                        .iter()
                        .chain(candidates.logging.iter())
                        .chain(candidates.explicit.iter())
                        .map(|r| r.name.clone())
                        .chain(
                            candidates
                                .fetch_failures
                                .iter()
                                .map(|(name, _)| name.clone()),
                        )
                        .chain(self.excluded_bundle_names())
                        .collect();
                    candidates.recommendations =
                        plan::eligible_recommendations(recipes, manifest, &taken);
                }
                Err(e) => tracing::warn!(
                    error = %format!("{:#}", e),
                    "failed to fetch recommendations, continuing without them"
                ),
            }
        }

        candidates
    }

    /// Decide which recommendations to install; the rest are broadcast
    /// SKIPPED (or FAILED when prompting broke).
    fn select_recommendations(
        &self,
        state: &mut RunState,
        recommendations: Vec<Recipe>,
    ) -> Vec<Recipe> {
        if recommendations.is_empty() {
            return recommendations;
        }
        if self.context.assume_yes {
            return recommendations;
        }

        let prompter = &self.services.prompter;
        let picked = prompter
            .prompt_yes_no(CONFIRM_RECOMMENDATIONS)
            .and_then(|yes| {
                if !yes {
                    return Ok(Vec::new());
                }
                let labels: Vec<String> =
                    recommendations.iter().map(|r| r.label().to_string()).collect();
                prompter.prompt_multi_select(SELECT_RECOMMENDATIONS, &labels)
            });

        match picked {
            Ok(labels) => {
                let (chosen, declined) = plan::split_by_labels(recommendations, &labels);
                for recipe in &declined {
                    self.transition(state, recipe, InstallStatus::Skipped, None);
                }
                chosen
            }
            Err(e) => {
                let error = InstallError::PromptFailure(format!("{:#}", e));
                tracing::error!(error = %error, "could not ask which integrations to install");
                for recipe in &recommendations {
                    self.transition(state, recipe, InstallStatus::Failed, Some(&error));
                    state.record_failure(&recipe.name);
                }
                Vec::new()
            }
        }
    }

    fn process(&self, state: &mut RunState, manifest: &DiscoveryManifest, queue: &[Recipe]) {
        for (position, recipe) in queue.iter().enumerate() {
            if self.services.cancel.is_cancelled() {
                self.cancel_remaining(state, &queue[position..]);
                return;
            }

            let deps = plan::effective_dependencies(recipe, &self.services.bundle);
            if let Some(blocker) = deps.iter().find(|dep| state.blocked.contains(**dep)) {
                tracing::warn!(
                    recipe = %recipe.name,
                    dependency = %blocker,
                    "skipping recipe, a dependency did not install"
                );
                self.transition(state, recipe, InstallStatus::Skipped, None);
                state.blocked.insert(recipe.name.clone());
                continue;
            }

            if !self.transition(state, recipe, InstallStatus::Installing, None) {
                continue;
            }
            match self.install_recipe(manifest, recipe) {
                Ok(()) => {
                    tracing::info!(recipe = %recipe.name, "recipe installed");
                    self.transition(state, recipe, InstallStatus::Installed, None);
                }
                Err(Interrupted::Failed(error)) => {
                    tracing::error!(recipe = %recipe.name, error = %error, "recipe failed");
                    self.transition(state, recipe, InstallStatus::Failed, Some(&error));
                    state.record_failure(&recipe.name);
                }
                Err(Interrupted::Canceled) => {
                    self.cancel_remaining(state, &queue[position..]);
                    return;
                }
            }
        }
    }

    fn install_recipe(
        &self,
        manifest: &DiscoveryManifest,
        recipe: &Recipe,
    ) -> Result<(), Interrupted> {
        let services = &self.services;
        let vars = services
            .executor
            .prepare(manifest, recipe, self.context.assume_yes)?;

        if self.context.test_mode {
            tracing::info!(recipe = %recipe.name, "test mode, skipping execution and validation");
            return Ok(());
        }

        services
            .progress
            .start(&format!("Installing {}", recipe.label()));
        let executed = services.executor.execute(manifest, recipe, &vars);
        match &executed {
            Ok(()) => services.progress.success(),
            Err(_) => services.progress.fail(),
        }
        executed?;

        if services.cancel.is_cancelled() {
            return Err(Interrupted::Canceled);
        }

        if recipe.has_validation() {
            services.validator.validate(recipe, &vars).map_err(|e| {
                if services.cancel.is_cancelled() {
                    Interrupted::Canceled
                } else {
                    Interrupted::Failed(InstallError::ValidationFailure {
                        recipe: recipe.name.clone(),
                        reason: format!("{:#}", e),
                    })
                }
            })?;
        }
        Ok(())
    }

    fn cancel_remaining(&self, state: &mut RunState, remaining: &[Recipe]) {
        tracing::warn!(remaining = remaining.len(), "installation canceled");
        state.canceled = true;
        for recipe in remaining {
            self.transition(state, recipe, InstallStatus::Canceled, None);
        }
    }

    /// Broadcast a status change when it moves the recipe forward.
    fn transition(
        &self,
        state: &mut RunState,
        recipe: &Recipe,
        next: InstallStatus,
        error: Option<&InstallError>,
    ) -> bool {
        if let Some(current) = state.statuses.get(&recipe.name)
            && !current.can_transition_to(next)
        {
            tracing::debug!(
                recipe = %recipe.name,
                from = %current,
                to = %next,
                "ignoring backward status transition"
            );
            return false;
        }
        state.statuses.insert(recipe.name.clone(), next);

        self.services.status.recipe_status(recipe, next, error);
        true
    }
}

fn join_fetch(
    (name, handle): (String, std::thread::ScopedJoinHandle<'_, anyhow::Result<Recipe>>),
) -> Fetched {
    let result = handle
        .join()
        .unwrap_or_else(|_| Err(anyhow::anyhow!("recipe fetch panicked")));
    (name, result)
}

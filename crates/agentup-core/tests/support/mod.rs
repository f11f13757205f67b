//! Shared fakes for installer integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use url::Url;

use agentup_core::config::BundleSettings;
use agentup_core::discovery::Discoverer;
use agentup_core::error::InstallError;
use agentup_core::execution::{
    RecipeExecutor, StatusEvent, StatusEventKind, StatusReporter, StatusRollup,
};
use agentup_core::install::InstallerServices;
use agentup_core::recipes::{RecipeFetcher, RecipeFile, RecipeFileFetcher};
use agentup_core::types::{
    DiscoveryManifest, InstallStatus, InstallTarget, InstallTargetType, Recipe, RecipeVars,
};
use agentup_core::ux::{NoopProgress, Prompter};
use agentup_core::validation::RecipeValidator;

pub const INFRA: &str = "infra-agent";
pub const LOGGING: &str = "logging";

pub fn bundle() -> BundleSettings {
    BundleSettings {
        infra_agent: INFRA.to_string(),
        logging: LOGGING.to_string(),
        infra_is_root: true,
    }
}

pub fn host_manifest() -> DiscoveryManifest {
    DiscoveryManifest {
        hostname: "web-1".to_string(),
        os: "linux".to_string(),
        platform: "ubuntu".to_string(),
        platform_family: "debian".to_string(),
        platform_version: "22.04".to_string(),
        kernel_arch: "x86_64".to_string(),
        kernel_version: "6.1.0".to_string(),
    }
}

pub fn recipe(name: &str) -> Recipe {
    Recipe::named(name)
}

pub fn recipe_with_validation(name: &str) -> Recipe {
    Recipe {
        validation_query: format!("SELECT count(*) FROM {}", name),
        ..Recipe::named(name)
    }
}

pub fn recipe_depending_on(name: &str, deps: &[&str]) -> Recipe {
    Recipe {
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        ..Recipe::named(name)
    }
}

pub fn recipe_targeting(name: &str, target: InstallTargetType) -> Recipe {
    Recipe {
        install_targets: vec![InstallTarget::of_type(target)],
        ..Recipe::named(name)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

pub struct FakeDiscoverer {
    pub result: Result<DiscoveryManifest, String>,
    pub calls: Arc<AtomicUsize>,
}

impl Discoverer for FakeDiscoverer {
    fn discover(&self) -> anyhow::Result<DiscoveryManifest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FetchLog {
    pub recipes: Mutex<HashMap<String, usize>>,
    pub recommendations: AtomicUsize,
}

impl FetchLog {
    pub fn recipe_calls(&self, name: &str) -> usize {
        self.recipes.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn recommendation_calls(&self) -> usize {
        self.recommendations.load(Ordering::SeqCst)
    }
}

pub struct FakeFetcher {
    pub recipes: HashMap<String, Recipe>,
    pub recommendations: Result<Vec<Recipe>, String>,
    pub log: Arc<FetchLog>,
}

impl RecipeFetcher for FakeFetcher {
    fn fetch_recipe(&self, name: &str) -> anyhow::Result<Recipe> {
        *self
            .log
            .recipes
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default() += 1;
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Recipe '{}' not found in catalog", name))
    }

    fn fetch_recommendations(&self, _manifest: &DiscoveryManifest) -> anyhow::Result<Vec<Recipe>> {
        self.log.recommendations.fetch_add(1, Ordering::SeqCst);
        self.recommendations
            .clone()
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[derive(Default)]
pub struct FakeFileFetcher {
    pub files: HashMap<String, RecipeFile>,
}

impl FakeFileFetcher {
    fn lookup(&self, key: &str) -> anyhow::Result<RecipeFile> {
        self.files
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no recipe file at {}", key))
    }
}

impl RecipeFileFetcher for FakeFileFetcher {
    fn fetch_from_url(&self, url: &Url) -> anyhow::Result<RecipeFile> {
        self.lookup(url.as_str())
    }

    fn load_from_path(&self, path: &Path) -> anyhow::Result<RecipeFile> {
        self.lookup(&path.to_string_lossy())
    }
}

// ---------------------------------------------------------------------------
// Execution and validation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ExecutionLog {
    pub prepared: Mutex<Vec<String>>,
    pub executed: Mutex<Vec<String>>,
}

impl ExecutionLog {
    pub fn prepared(&self) -> Vec<String> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeExecutor {
    pub fail_prepare: HashSet<String>,
    pub fail_execute: HashSet<String>,
    /// Cancel this token while executing the named recipe.
    pub cancel_on: Option<(String, CancellationToken)>,
    pub log: Arc<ExecutionLog>,
}

impl RecipeExecutor for FakeExecutor {
    fn prepare(
        &self,
        _manifest: &DiscoveryManifest,
        recipe: &Recipe,
        _assume_yes: bool,
    ) -> Result<RecipeVars, InstallError> {
        self.log.prepared.lock().unwrap().push(recipe.name.clone());
        if self.fail_prepare.contains(&recipe.name) {
            return Err(InstallError::MissingCredential("license key"));
        }
        Ok(RecipeVars::from([("HOSTNAME".to_string(), "web-1".to_string())]))
    }

    fn execute(
        &self,
        _manifest: &DiscoveryManifest,
        recipe: &Recipe,
        _vars: &RecipeVars,
    ) -> Result<(), InstallError> {
        self.log.executed.lock().unwrap().push(recipe.name.clone());
        if let Some((name, token)) = &self.cancel_on
            && name == &recipe.name
        {
            token.cancel();
        }
        if self.fail_execute.contains(&recipe.name) {
            return Err(InstallError::ExecutionFailure {
                recipe: recipe.name.clone(),
                source: agentup_core::execution::StepError::Exit {
                    command: "install.sh".to_string(),
                    code: Some(1),
                    stderr: "boom".to_string(),
                },
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeValidator {
    pub failing: HashSet<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecipeValidator for FakeValidator {
    fn validate(&self, recipe: &Recipe, _vars: &RecipeVars) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(recipe.name.clone());
        if self.failing.contains(&recipe.name) {
            anyhow::bail!("no telemetry received for {}", recipe.name);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct PromptLog {
    pub yes_no: AtomicUsize,
    pub multi_select: AtomicUsize,
    pub text: AtomicUsize,
    pub offered: Mutex<Vec<String>>,
}

impl PromptLog {
    pub fn total(&self) -> usize {
        self.yes_no.load(Ordering::SeqCst)
            + self.multi_select.load(Ordering::SeqCst)
            + self.text.load(Ordering::SeqCst)
    }
}

pub struct ScriptedPrompter {
    /// `None` makes the yes/no prompt fail.
    pub answer: Option<bool>,
    /// Labels to pick; `None` picks every offered option.
    pub pick: Option<Vec<String>>,
    pub text: HashMap<String, String>,
    pub log: Arc<PromptLog>,
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self {
            answer: Some(true),
            pick: None,
            text: HashMap::new(),
            log: Arc::new(PromptLog::default()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_yes_no(&self, _message: &str) -> anyhow::Result<bool> {
        self.log.yes_no.fetch_add(1, Ordering::SeqCst);
        self.answer
            .ok_or_else(|| anyhow::anyhow!("input stream closed"))
    }

    fn prompt_multi_select(
        &self,
        _message: &str,
        options: &[String],
    ) -> anyhow::Result<Vec<String>> {
        self.log.multi_select.fetch_add(1, Ordering::SeqCst);
        self.log.offered.lock().unwrap().extend(options.iter().cloned());
        Ok(self.pick.clone().unwrap_or_else(|| options.to_vec()))
    }

    fn prompt_text(
        &self,
        message: &str,
        default: Option<&str>,
        _secret: bool,
    ) -> anyhow::Result<String> {
        self.log.text.fetch_add(1, Ordering::SeqCst);
        let name = message.split(':').next().unwrap_or(message);
        match self.text.get(name) {
            Some(value) => Ok(value.clone()),
            None => default
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("no scripted answer for {}", message)),
        }
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub kind: StatusEventKind,
    pub recipes: Vec<String>,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<Recorded>>>,
}

impl StatusReporter for RecordingReporter {
    fn name(&self) -> &str {
        "recording"
    }

    fn report(&self, event: &StatusEvent<'_>) -> anyhow::Result<()> {
        let recorded = match event {
            StatusEvent::RecipesAvailable(recipes) => Recorded {
                kind: event.kind(),
                recipes: recipes.iter().map(|r| r.name.clone()).collect(),
                error: None,
            },
            StatusEvent::Recipe(e) => Recorded {
                kind: event.kind(),
                recipes: vec![e.recipe.name.clone()],
                error: e.error.map(ToString::to_string),
            },
            StatusEvent::Complete(error) => Recorded {
                kind: event.kind(),
                recipes: Vec::new(),
                error: error.map(ToString::to_string),
            },
        };
        self.events.lock().unwrap().push(recorded);
        Ok(())
    }
}

/// Read-only view over recorded events.
#[derive(Clone)]
pub struct Events(pub Arc<Mutex<Vec<Recorded>>>);

impl Events {
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, kind: StatusEventKind) -> usize {
        self.all().iter().filter(|e| e.kind == kind).count()
    }

    pub fn count_for(&self, kind: StatusEventKind, name: &str) -> usize {
        self.all()
            .iter()
            .filter(|e| e.kind == kind && e.recipes.iter().any(|r| r == name))
            .count()
    }

    pub fn names(&self, kind: StatusEventKind) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|e| e.kind == kind)
            .flat_map(|e| e.recipes)
            .collect()
    }

    /// Statuses a recipe went through, from its per-recipe events.
    pub fn statuses(&self, name: &str) -> Vec<InstallStatus> {
        self.all()
            .iter()
            .filter(|e| e.recipes.len() == 1 && e.recipes[0] == name)
            .filter_map(|e| match e.kind {
                StatusEventKind::RecipeRecommended => Some(InstallStatus::Recommended),
                StatusEventKind::RecipeInstalling => Some(InstallStatus::Installing),
                StatusEventKind::RecipeInstalled => Some(InstallStatus::Installed),
                StatusEventKind::RecipeFailed => Some(InstallStatus::Failed),
                StatusEventKind::RecipeSkipped => Some(InstallStatus::Skipped),
                StatusEventKind::RecipeCanceled => Some(InstallStatus::Canceled),
                _ => None,
            })
            .collect()
    }

    pub fn complete_error(&self) -> Option<String> {
        self.all()
            .into_iter()
            .find(|e| e.kind == StatusEventKind::Complete)
            .and_then(|e| e.error)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Builder for a fully faked set of installer services.
pub struct Harness {
    pub manifest: Result<DiscoveryManifest, String>,
    pub catalog: HashMap<String, Recipe>,
    pub recommendations: Result<Vec<Recipe>, String>,
    pub files: HashMap<String, RecipeFile>,
    pub executor: FakeExecutor,
    pub validator: FakeValidator,
    pub prompter: ScriptedPrompter,
    pub bundle: BundleSettings,
    pub cancel: CancellationToken,
}

/// Handles to inspect after a run.
pub struct Probes {
    pub events: Events,
    pub fetches: Arc<FetchLog>,
    pub execution: Arc<ExecutionLog>,
    pub validations: Arc<Mutex<Vec<String>>>,
    pub prompts: Arc<PromptLog>,
    pub discoveries: Arc<AtomicUsize>,
}

impl Probes {
    pub fn validated(&self) -> Vec<String> {
        self.validations.lock().unwrap().clone()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Both bundle recipes in the catalog, no recommendations.
    pub fn new() -> Self {
        Self {
            manifest: Ok(host_manifest()),
            catalog: HashMap::from([
                (INFRA.to_string(), recipe(INFRA)),
                (LOGGING.to_string(), recipe(LOGGING)),
            ]),
            recommendations: Ok(Vec::new()),
            files: HashMap::new(),
            executor: FakeExecutor::default(),
            validator: FakeValidator::default(),
            prompter: ScriptedPrompter::default(),
            bundle: bundle(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_catalog_recipe(mut self, recipe: Recipe) -> Self {
        self.catalog.insert(recipe.name.clone(), recipe);
        self
    }

    pub fn without_catalog_recipe(mut self, name: &str) -> Self {
        self.catalog.remove(name);
        self
    }

    pub fn with_recommendations(mut self, recipes: Vec<Recipe>) -> Self {
        self.recommendations = Ok(recipes);
        self
    }

    pub fn failing_validation(mut self, name: &str) -> Self {
        self.validator.failing.insert(name.to_string());
        self
    }

    pub fn failing_execution(mut self, name: &str) -> Self {
        self.executor.fail_execute.insert(name.to_string());
        self
    }

    pub fn answering(mut self, answer: Option<bool>) -> Self {
        self.prompter.answer = answer;
        self
    }

    pub fn picking(mut self, labels: &[&str]) -> Self {
        self.prompter.pick = Some(labels.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn build(self) -> (InstallerServices, Probes) {
        self.build_with_reporters(Vec::new())
    }

    /// Extra reporters are registered before the recording reporter.
    pub fn build_with_reporters(
        self,
        mut reporters: Vec<Box<dyn StatusReporter>>,
    ) -> (InstallerServices, Probes) {
        let events = Arc::new(Mutex::new(Vec::new()));
        reporters.push(Box::new(RecordingReporter {
            events: Arc::clone(&events),
        }));

        let fetches = Arc::new(FetchLog::default());
        let discoveries = Arc::new(AtomicUsize::new(0));

        let probes = Probes {
            events: Events(events),
            fetches: Arc::clone(&fetches),
            execution: Arc::clone(&self.executor.log),
            validations: Arc::clone(&self.validator.calls),
            prompts: Arc::clone(&self.prompter.log),
            discoveries: Arc::clone(&discoveries),
        };

        let services = InstallerServices {
            discoverer: Box::new(FakeDiscoverer {
                result: self.manifest,
                calls: discoveries,
            }),
            recipe_fetcher: Box::new(FakeFetcher {
                recipes: self.catalog,
                recommendations: self.recommendations,
                log: fetches,
            }),
            file_fetcher: Box::new(FakeFileFetcher { files: self.files }),
            executor: Box::new(self.executor),
            validator: Box::new(self.validator),
            status: StatusRollup::new(reporters),
            prompter: Arc::new(self.prompter),
            progress: Box::new(NoopProgress),
            bundle: self.bundle,
            cancel: self.cancel,
        };

        (services, probes)
    }
}

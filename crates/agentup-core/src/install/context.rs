//! Run configuration for one installation.

/// What to install and which stages to skip. Built once from the command
/// line and never changed while a run is in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallerContext {
    /// Recipes to fetch from the catalog by name
    pub recipe_names: Vec<String>,
    /// Recipe files to load, as filesystem paths or http(s) URLs
    pub recipe_paths: Vec<String>,
    /// Use an empty manifest instead of inspecting the host
    pub skip_discovery: bool,
    /// Do not install the infrastructure agent
    pub skip_infra_install: bool,
    /// Do not fetch or offer recommendations
    pub skip_integrations: bool,
    /// Do not install the logging recipe
    pub skip_logging_install: bool,
    /// Answer every prompt with its default and install everything offered
    pub assume_yes: bool,
    /// Resolve variables but skip execution and validation
    pub test_mode: bool,
}

impl InstallerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add recipes to fetch by name
    pub fn with_recipe_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipe_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add recipe files to load
    pub fn with_recipe_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipe_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_skip_discovery(mut self, skip: bool) -> Self {
        self.skip_discovery = skip;
        self
    }

    pub fn with_skip_infra_install(mut self, skip: bool) -> Self {
        self.skip_infra_install = skip;
        self
    }

    pub fn with_skip_integrations(mut self, skip: bool) -> Self {
        self.skip_integrations = skip;
        self
    }

    pub fn with_skip_logging_install(mut self, skip: bool) -> Self {
        self.skip_logging_install = skip;
        self
    }

    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Whether the operator named recipes to install.
    pub fn has_explicit_recipes(&self) -> bool {
        !self.recipe_names.is_empty() || !self.recipe_paths.is_empty()
    }

    /// Explicit recipes narrow the run unless everything was accepted up front.
    pub fn explicit_only(&self) -> bool {
        self.has_explicit_recipes() && !self.assume_yes
    }

    pub fn should_install_logging(&self) -> bool {
        !self.skip_logging_install && !self.explicit_only()
    }

    pub fn should_fetch_recommendations(&self) -> bool {
        !self.skip_integrations && !self.explicit_only()
    }
}

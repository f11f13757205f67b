//! Agentup - telemetry agent installer
//!
//! Usage:
//!   agentup install                   # infra agent, logging, recommended integrations
//!   agentup install -n mysql -y       # one catalog recipe, no prompts
//!   agentup install -c ./redis.yml    # a local or remote recipe file

mod interactive;
mod progress;
mod reporter;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agentup_core::config::{ConfigStore, Settings, paths};
use agentup_core::discovery::SystemDiscoverer;
use agentup_core::execution::{
    LogStatusReporter, OutputMode, ShellStepRunner, StatusFileReporter, StatusRollup,
    TaskRecipeExecutor, VariableResolver,
};
use agentup_core::install::{InstallerContext, InstallerServices, RecipeInstaller};
use agentup_core::recipes::{CatalogClient, RecipeFileLoader};
use agentup_core::types::RecipeVars;
use agentup_core::ux::{NonInteractivePrompter, NoopProgress, ProgressIndicator, Prompter};
use agentup_core::validation::{HttpTelemetryClient, PollingValidator};

use crate::interactive::DialoguerPrompter;
use crate::progress::SpinnerProgress;
use crate::reporter::ConsoleStatusReporter;

const DEFAULT_FILTER: &str = "agentup=info,warn";

#[derive(Parser)]
#[command(name = "agentup")]
#[command(about = "Install and validate telemetry agents from recipes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the infrastructure agent, logging and recommended integrations
    Install(Box<InstallArgs>),
}

#[derive(Args)]
struct InstallArgs {
    /// Recipe file to install (path or http(s) URL), repeatable
    #[arg(short = 'c', long = "recipe-path", value_name = "PATH")]
    recipe_paths: Vec<String>,

    /// Catalog recipe to install by name, repeatable
    #[arg(short = 'n', long = "recipe", value_name = "NAME")]
    recipes: Vec<String>,

    /// Skip host discovery
    #[arg(short = 'd', long)]
    skip_discovery: bool,

    /// Skip the infrastructure agent
    #[arg(short = 'i', long)]
    skip_infra_install: bool,

    /// Skip recommended integrations
    #[arg(short = 'r', long)]
    skip_integrations: bool,

    /// Skip the logging recipe
    #[arg(short = 'l', long)]
    skip_logging_install: bool,

    /// Resolve variables only; run no install steps
    #[arg(short = 't', long)]
    test_mode: bool,

    /// Skip all confirmation prompts (for CI/CD)
    #[arg(short = 'y', long)]
    assume_yes: bool,

    /// Debug logging; recipe output is streamed
    #[arg(long)]
    debug: bool,

    /// Trace logging
    #[arg(long, conflicts_with = "debug")]
    trace: bool,

    /// Credential profile from config.toml
    #[arg(long)]
    profile: Option<String>,

    /// Variable passed to every recipe (KEY=VALUE)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

impl InstallArgs {
    fn context(&self) -> InstallerContext {
        InstallerContext::new()
            .with_recipe_paths(&self.recipe_paths)
            .with_recipe_names(&self.recipes)
            .with_skip_discovery(self.skip_discovery)
            .with_skip_infra_install(self.skip_infra_install)
            .with_skip_integrations(self.skip_integrations)
            .with_skip_logging_install(self.skip_logging_install)
            .with_assume_yes(self.assume_yes)
            .with_test_mode(self.test_mode)
    }

    fn log_level(&self) -> Option<&'static str> {
        if self.trace {
            Some("trace")
        } else if self.debug {
            Some("debug")
        } else {
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Install(args) => {
            init_tracing(args.log_level());
            run_install(*args)
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("agentup={level},warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_install(args: InstallArgs) -> Result<()> {
    let store = ConfigStore::with_defaults()?;
    let settings = store.load()?;
    tracing::debug!(config = %store.config_path().display(), "loaded configuration");

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone())?;

    let services = build_services(&settings, &args, cancel)?;
    let installer = RecipeInstaller::new(args.context(), services);
    installer.install()?;
    Ok(())
}

fn build_services(
    settings: &Settings,
    args: &InstallArgs,
    cancel: CancellationToken,
) -> Result<InstallerServices> {
    let profile = settings.active_profile(args.profile.as_deref(), |key| std::env::var(key).ok())?;
    let request_timeout = Duration::from_secs(settings.catalog.timeout_secs);
    let attended = console::user_attended();

    let prompter: Arc<dyn Prompter> = if attended {
        Arc::new(DialoguerPrompter::new())
    } else {
        Arc::new(NonInteractivePrompter)
    };

    // Streamed step output and a spinner would fight over the terminal.
    let progress: Box<dyn ProgressIndicator> =
        if attended && OutputMode::for_current_level() == OutputMode::Capture {
            Box::new(SpinnerProgress::new())
        } else {
            Box::new(NoopProgress)
        };

    let recipe_fetcher =
        CatalogClient::new(&settings.catalog.url, profile.api_key.clone(), request_timeout)?;
    let telemetry = HttpTelemetryClient::new(
        &settings.validation.endpoint,
        profile.api_key.clone(),
        profile.account_id,
        request_timeout,
    )?;
    let validator = PollingValidator::new(Box::new(telemetry), cancel.clone())?
        .with_timeout(settings.validation.timeout())
        .with_interval(settings.validation.interval());

    let resolver = VariableResolver::new(profile, Arc::clone(&prompter));
    let executor = TaskRecipeExecutor::new(resolver, Box::new(ShellStepRunner::new()))
        .with_global_vars(parse_vars(&args.vars)?);

    Ok(InstallerServices {
        discoverer: Box::new(SystemDiscoverer::new()),
        recipe_fetcher: Box::new(recipe_fetcher),
        file_fetcher: Box::new(RecipeFileLoader::new(request_timeout)?),
        executor: Box::new(executor),
        validator: Box::new(validator),
        status: status_rollup(),
        prompter,
        progress,
        bundle: settings.bundle.clone(),
        cancel,
    })
}

fn status_rollup() -> StatusRollup {
    let rollup = StatusRollup::default()
        .with_reporter(ConsoleStatusReporter::new())
        .with_reporter(LogStatusReporter);

    match paths::default_state_dir() {
        Ok(dir) => rollup.with_reporter(StatusFileReporter::new(paths::status_path(&dir))),
        Err(e) => {
            tracing::warn!(error = %e, "status file disabled");
            rollup
        }
    }
}

/// First Ctrl-C cancels the run after the current step; a second one exits.
fn cancel_on_interrupt(cancel: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create signal runtime")?;

    std::thread::Builder::new()
        .name("agentup-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                tracing::warn!("interrupt received, finishing the current step");
                cancel.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        })
        .context("Failed to start signal handler")?;
    Ok(())
}

fn parse_vars(pairs: &[String]) -> Result<RecipeVars> {
    pairs.iter().map(|pair| parse_var(pair)).collect()
}

fn parse_var(pair: &str) -> Result<(String, String)> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid --set value '{}': expected KEY=VALUE", pair))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid --set value '{}': empty key", pair);
    }
    Ok((key.to_string(), value.to_string()))
}

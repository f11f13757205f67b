//! Built-in status reporters.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::{StatusEvent, StatusReporter};
use crate::types::InstallStatus;

/// Emits every lifecycle event as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusReporter;

impl StatusReporter for LogStatusReporter {
    fn name(&self) -> &str {
        "log"
    }

    fn report(&self, event: &StatusEvent<'_>) -> anyhow::Result<()> {
        match event {
            StatusEvent::RecipesAvailable(recipes) => {
                let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
                tracing::info!(count = recipes.len(), recipes = ?names, "recipes available");
            }
            StatusEvent::Recipe(event) => match event.error {
                Some(error) => tracing::error!(
                    recipe = %event.recipe.name,
                    status = %event.status,
                    error = %error,
                    "recipe status"
                ),
                None => tracing::info!(
                    recipe = %event.recipe.name,
                    status = %event.status,
                    "recipe status"
                ),
            },
            StatusEvent::Complete(None) => tracing::info!("installation complete"),
            StatusEvent::Complete(Some(error)) => {
                tracing::error!(error = %error, "installation complete with errors")
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecipeRecord {
    name: String,
    display_name: String,
    status: InstallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunDocument {
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    recipes: Vec<RecipeRecord>,
}

impl RunDocument {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            updated_at: now,
            complete: false,
            error: None,
            recipes: Vec::new(),
        }
    }

    fn apply(&mut self, event: &StatusEvent<'_>, now: DateTime<Utc>) {
        self.updated_at = now;
        match event {
            StatusEvent::RecipesAvailable(recipes) => {
                for recipe in recipes.iter() {
                    if !self.recipes.iter().any(|r| r.name == recipe.name) {
                        self.recipes.push(RecipeRecord {
                            name: recipe.name.clone(),
                            display_name: recipe.label().to_string(),
                            status: InstallStatus::Available,
                            error: None,
                            updated_at: now,
                        });
                    }
                }
            }
            StatusEvent::Recipe(event) => {
                let error = event.error.map(ToString::to_string);
                match self.recipes.iter_mut().find(|r| r.name == event.recipe.name) {
                    Some(record) => {
                        record.status = event.status;
                        record.error = error;
                        record.updated_at = now;
                    }
                    None => self.recipes.push(RecipeRecord {
                        name: event.recipe.name.clone(),
                        display_name: event.recipe.label().to_string(),
                        status: event.status,
                        error,
                        updated_at: now,
                    }),
                }
            }
            StatusEvent::Complete(error) => {
                self.complete = true;
                self.error = error.map(ToString::to_string);
            }
        }
    }
}

/// Writes a JSON document describing the current run after every event.
#[derive(Debug)]
pub struct StatusFileReporter {
    path: PathBuf,
    document: Mutex<RunDocument>,
}

impl StatusFileReporter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            document: Mutex::new(RunDocument::new(Utc::now())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, document: &RunDocument) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }
        let bytes =
            serde_json::to_vec_pretty(document).context("Failed to serialize status document")?;
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("Failed to write status file: {}", self.path.display()))?;
        Ok(())
    }
}

impl StatusReporter for StatusFileReporter {
    fn name(&self) -> &str {
        "status-file"
    }

    fn report(&self, event: &StatusEvent<'_>) -> anyhow::Result<()> {
        let mut document = self
            .document
            .lock()
            .map_err(|_| anyhow::anyhow!("status document lock poisoned"))?;
        document.apply(event, Utc::now());
        self.write(&document)
    }
}

//! Step runner: executes a YAML task description with `sh -c`.
//!
//! Task file layout:
//!
//! ```yaml
//! version: "3"
//! tasks:
//!   default:
//!     deps: [prepare]
//!     env: { APT_LISTCHANGES_FRONTEND: none }
//!     dir: /tmp
//!     cmds:
//!       - curl -s {{.DOWNLOAD_URL}} -o agent.tgz
//!       - task: unpack
//!       - cmd: systemctl restart agent
//!         ignoreError: true
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::template::render;
use crate::types::RecipeVars;

const DEFAULT_TASK: &str = "default";

/// Whether subprocess output is captured or passed through to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Capture,
    Stream,
}

impl OutputMode {
    /// Stream when the active tracing level is more verbose than INFO.
    pub fn for_current_level() -> Self {
        use tracing::level_filters::LevelFilter;

        if LevelFilter::current() > LevelFilter::INFO {
            OutputMode::Stream
        } else {
            OutputMode::Capture
        }
    }
}

/// Output collected while running a task file. Empty when streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("failed to load task file {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("task '{0}' is not defined")]
    UnknownTask(String),

    #[error("task dependency cycle: {0}")]
    Cycle(String),

    #[error("failed to start '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' {}", exit_label(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to write task file: {0}")]
    Serialize(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl StepError {
    /// Captured stderr, when the failure was a non-zero exit.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            StepError::Exit { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Runs a serialized task description with the given variables.
pub trait StepRunner: Send + Sync {
    fn run(
        &self,
        task_file: &Path,
        vars: &RecipeVars,
        mode: OutputMode,
    ) -> Result<StepOutput, StepError>;
}

#[derive(Debug, Deserialize)]
struct TaskFile {
    #[serde(default)]
    tasks: BTreeMap<String, Task>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Task {
    deps: Vec<String>,
    cmds: Vec<TaskCommand>,
    env: BTreeMap<String, String>,
    dir: Option<String>,
    ignore_error: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskCommand {
    Shell(String),
    Call {
        task: String,
    },
    Detailed {
        cmd: String,
        #[serde(default, rename = "ignoreError")]
        ignore_error: bool,
    },
}

/// Default [`StepRunner`] backed by the system shell.
#[derive(Debug, Clone)]
pub struct ShellStepRunner {
    shell: PathBuf,
}

impl Default for ShellStepRunner {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("sh"),
        }
    }
}

impl ShellStepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(path: &Path) -> Result<TaskFile, StepError> {
        let content = std::fs::read_to_string(path).map_err(|e| StepError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| StepError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn entry_task(file: &TaskFile) -> Result<String, StepError> {
        if file.tasks.contains_key(DEFAULT_TASK) {
            return Ok(DEFAULT_TASK.to_string());
        }
        match file.tasks.keys().collect::<Vec<_>>().as_slice() {
            [only] => Ok((*only).clone()),
            _ => Err(StepError::UnknownTask(DEFAULT_TASK.to_string())),
        }
    }
}

impl StepRunner for ShellStepRunner {
    fn run(
        &self,
        task_file: &Path,
        vars: &RecipeVars,
        mode: OutputMode,
    ) -> Result<StepOutput, StepError> {
        let file = Self::load(task_file)?;
        let entry = Self::entry_task(&file)?;

        let mut run = TaskRun {
            shell: &self.shell,
            file: &file,
            vars,
            mode,
            stack: Vec::new(),
            done: BTreeSet::new(),
            output: StepOutput::default(),
        };
        run.task(&entry, false)?;
        Ok(run.output)
    }
}

/// State for one invocation of a task file.
struct TaskRun<'a> {
    shell: &'a Path,
    file: &'a TaskFile,
    vars: &'a RecipeVars,
    mode: OutputMode,
    stack: Vec<String>,
    done: BTreeSet<String>,
    output: StepOutput,
}

impl TaskRun<'_> {
    /// Run a task. A dep that already ran is skipped; a `task:` call always runs.
    fn task(&mut self, name: &str, as_dep: bool) -> Result<(), StepError> {
        if self.stack.iter().any(|n| n == name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(StepError::Cycle(chain.join(" -> ")));
        }
        if as_dep && self.done.contains(name) {
            return Ok(());
        }

        let file = self.file;
        let task = file
            .tasks
            .get(name)
            .ok_or_else(|| StepError::UnknownTask(name.to_string()))?;

        self.stack.push(name.to_string());
        tracing::debug!(task = %name, "running task");

        for dep in &task.deps {
            self.task(dep, true)?;
        }

        for command in &task.cmds {
            match command {
                TaskCommand::Call { task: called } => self.task(called, false)?,
                TaskCommand::Shell(cmd) => self.command(task, cmd, task.ignore_error)?,
                TaskCommand::Detailed { cmd, ignore_error } => {
                    self.command(task, cmd, task.ignore_error || *ignore_error)?
                }
            }
        }

        self.stack.pop();
        self.done.insert(name.to_string());
        Ok(())
    }

    fn command(
        &mut self,
        task: &Task,
        template: &str,
        ignore_error: bool,
    ) -> Result<(), StepError> {
        // Rendered text may hold credentials. Only the template is logged or reported.
        let command = template.to_string();
        tracing::debug!(command = %command, "running command");

        let mut process = Command::new(self.shell);
        process
            .arg("-c")
            .arg(render(template, self.vars))
            .stdin(Stdio::null());
        process.envs(self.vars);
        process.envs(
            task.env
                .iter()
                .map(|(key, value)| (key, render(value, self.vars))),
        );
        if let Some(dir) = &task.dir {
            process.current_dir(render(dir, self.vars));
        }

        let (status, stderr) = match self.mode {
            OutputMode::Capture => {
                let output = process.output().map_err(|source| StepError::Spawn {
                    command: command.clone(),
                    source,
                })?;
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                self.output.stdout.push_str(&stdout);
                self.output.stderr.push_str(&stderr);
                (output.status, stderr)
            }
            OutputMode::Stream => {
                let status = process
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(|source| StepError::Spawn {
                        command: command.clone(),
                        source,
                    })?;
                (status, String::new())
            }
        };

        if status.success() {
            return Ok(());
        }
        if ignore_error {
            tracing::warn!(command = %command, code = ?status.code(), "command failed, continuing");
            return Ok(());
        }
        Err(StepError::Exit {
            command,
            code: status.code(),
            stderr,
        })
    }
}

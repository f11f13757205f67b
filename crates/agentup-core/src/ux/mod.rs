//! Operator interaction seams: prompts and progress display.
//!
//! The installer only talks to these traits; terminal rendering lives in the
//! CLI crate.

/// Blocking interactive prompts.
pub trait Prompter: Send + Sync {
    fn prompt_yes_no(&self, message: &str) -> anyhow::Result<bool>;

    /// Returns the chosen subset of `options`, in option order.
    fn prompt_multi_select(&self, message: &str, options: &[String])
    -> anyhow::Result<Vec<String>>;

    /// Free-text input; `secret` masks what is typed.
    fn prompt_text(&self, message: &str, default: Option<&str>, secret: bool)
    -> anyhow::Result<String>;
}

/// Progress shown while a recipe's steps run.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self, message: &str);
    fn success(&self);
    fn fail(&self);
}

/// Progress indicator that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressIndicator for NoopProgress {
    fn start(&self, _message: &str) {}
    fn success(&self) {}
    fn fail(&self) {}
}

/// Prompter for unattended runs: every prompt is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn prompt_yes_no(&self, message: &str) -> anyhow::Result<bool> {
        anyhow::bail!("cannot ask '{}' in a non-interactive session", message)
    }

    fn prompt_multi_select(
        &self,
        message: &str,
        _options: &[String],
    ) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("cannot ask '{}' in a non-interactive session", message)
    }

    fn prompt_text(
        &self,
        message: &str,
        _default: Option<&str>,
        _secret: bool,
    ) -> anyhow::Result<String> {
        anyhow::bail!("cannot ask '{}' in a non-interactive session", message)
    }
}

//! Spinner shown while a recipe's install steps run.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use agentup_core::ux::ProgressIndicator;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK_INTERVAL_MS: u64 = 80;

/// [`ProgressIndicator`] rendered as an indicatif spinner.
#[derive(Default)]
pub struct SpinnerProgress {
    current: Mutex<Option<ProgressBar>>,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(&self, mark: &str) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if let Some(bar) = current.take() {
            bar.set_style(finished_style(mark));
            bar.finish();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("  {spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS)
}

fn finished_style(mark: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(&format!("  {mark} {{msg}} {{elapsed:.dim}}"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl ProgressIndicator for SpinnerProgress {
    fn start(&self, message: &str) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if let Some(previous) = current.take() {
            previous.finish_and_clear();
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(TICK_INTERVAL_MS));
        *current = Some(bar);
    }

    fn success(&self) {
        self.finish(&console::style("✓").green().to_string());
    }

    fn fail(&self) {
        self.finish(&console::style("✗").red().to_string());
    }
}

//! Human-readable run progress on the terminal.

use std::io::{self, Write};
use std::sync::Mutex;

use console::style;

use agentup_core::execution::{StatusEvent, StatusReporter};
use agentup_core::types::InstallStatus;

#[derive(Debug, Default)]
struct Tally {
    installed: usize,
    failed: usize,
    skipped: usize,
    canceled: usize,
}

struct Inner<W> {
    writer: W,
    tally: Tally,
}

/// Prints one line per recipe status change and a summary at the end.
pub struct ConsoleStatusReporter<W: Write + Send = io::Stdout> {
    inner: Mutex<Inner<W>>,
}

impl ConsoleStatusReporter<io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ConsoleStatusReporter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> ConsoleStatusReporter<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                writer,
                tally: Tally::default(),
            }),
        }
    }

    #[cfg(test)]
    fn into_writer(self) -> W {
        match self.inner.into_inner() {
            Ok(inner) => inner.writer,
            Err(poisoned) => poisoned.into_inner().writer,
        }
    }
}

impl<W: Write + Send> StatusReporter for ConsoleStatusReporter<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn report(&self, event: &StatusEvent<'_>) -> anyhow::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("console reporter lock poisoned"))?;
        let Inner { writer, tally } = &mut *inner;

        match event {
            StatusEvent::RecipesAvailable(recipes) => {
                if !recipes.is_empty() {
                    writeln!(writer)?;
                    writeln!(
                        writer,
                        "{}",
                        style(format!("  {} recipe(s) to consider", recipes.len())).bold()
                    )?;
                }
            }
            StatusEvent::Recipe(event) => {
                let label = event.recipe.label();
                match event.status {
                    InstallStatus::Available => {}
                    InstallStatus::Recommended => {
                        writeln!(writer, "  • {} {}", label, style("(recommended)").dim())?;
                    }
                    InstallStatus::Installing => {
                        writeln!(writer, "{} Installing {}", style("→").cyan(), label)?;
                    }
                    InstallStatus::Installed => {
                        tally.installed += 1;
                        writeln!(writer, "{} {} installed", style("✓").green(), label)?;
                    }
                    InstallStatus::Failed => {
                        tally.failed += 1;
                        match event.error {
                            Some(error) => writeln!(
                                writer,
                                "{} {} failed: {}",
                                style("✗").red(),
                                label,
                                error
                            )?,
                            None => writeln!(writer, "{} {} failed", style("✗").red(), label)?,
                        }
                    }
                    InstallStatus::Skipped => {
                        tally.skipped += 1;
                        writeln!(writer, "{}", style(format!("- {label} skipped")).dim())?;
                    }
                    InstallStatus::Canceled => {
                        tally.canceled += 1;
                        writeln!(writer, "{} {} canceled", style("⚠").yellow(), label)?;
                    }
                }
            }
            StatusEvent::Complete(error) => {
                writeln!(writer)?;
                writeln!(
                    writer,
                    "  {} installed, {} failed, {} skipped, {} canceled",
                    style(tally.installed).green(),
                    style(tally.failed).red(),
                    tally.skipped,
                    tally.canceled
                )?;
                if let Some(error) = error {
                    writeln!(writer, "  {}", style(error).red().bold())?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }
}

//! Terminal prompts for the installer.
//!
//! Uses dialoguer for terminal UI prompts.

use anyhow::Result;
use dialoguer::{Confirm, Input, MultiSelect, Password, theme::ColorfulTheme};

use agentup_core::ux::Prompter;

/// [`Prompter`] backed by dialoguer widgets on the attached terminal.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn prompt_yes_no(&self, message: &str) -> Result<bool> {
        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(true)
            .interact()?;
        Ok(confirmed)
    }

    fn prompt_multi_select(&self, message: &str, options: &[String]) -> Result<Vec<String>> {
        if options.is_empty() {
            return Ok(vec![]);
        }

        let defaults: Vec<bool> = options.iter().map(|_| true).collect();
        let selections = MultiSelect::with_theme(&self.theme)
            .with_prompt(format!("{message} (space to toggle, enter to confirm)"))
            .items(options)
            .defaults(&defaults)
            .interact()?;

        Ok(chosen(options, &selections))
    }

    fn prompt_text(&self, message: &str, default: Option<&str>, secret: bool) -> Result<String> {
        if secret {
            let value = Password::with_theme(&self.theme)
                .with_prompt(message)
                .allow_empty_password(default.is_some())
                .interact()?;
            return Ok(match default {
                Some(default) if value.is_empty() => default.to_string(),
                _ => value,
            });
        }

        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(message);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }
}

/// Selected options in option order, whatever order the indices came back in.
fn chosen(options: &[String], selections: &[usize]) -> Vec<String> {
    options
        .iter()
        .enumerate()
        .filter(|(i, _)| selections.contains(i))
        .map(|(_, option)| option.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        ["mysql", "nginx", "redis"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn chosen_keeps_option_order() {
        assert_eq!(chosen(&options(), &[2, 0]), ["mysql", "redis"]);
    }

    #[test]
    fn chosen_ignores_out_of_range() {
        assert_eq!(chosen(&options(), &[1, 7]), ["nginx"]);
    }

    #[test]
    fn empty_multi_select_does_not_prompt() {
        let prompter = DialoguerPrompter::new();
        assert!(prompter.prompt_multi_select("Pick", &[]).unwrap().is_empty());
    }
}

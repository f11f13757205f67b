//! `{{.NAME}}` placeholder substitution for task commands and validation queries.

use crate::types::RecipeVars;

/// Replace `{{.NAME}}` / `{{ .NAME }}` with the value from `vars`.
///
/// Unknown names render empty. Anything between braces that is not a plain
/// variable reference is left untouched.
pub fn render(template: &str, vars: &RecipeVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let inner = after_open[..close].trim();
        match variable_name(inner) {
            Some(name) => {
                if let Some(value) = vars.get(name) {
                    out.push_str(value);
                }
            }
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    out
}

fn variable_name(inner: &str) -> Option<&str> {
    let name = inner.strip_prefix('.')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

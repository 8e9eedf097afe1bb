use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Read an environment variable, treating empty values as unset
pub fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Substitute `{{ env.NAME }}` and `{{ env.NAME | default("x") }}` in raw TOML
///
/// Comment lines are left untouched so that commented-out settings never
/// require their variables to be present.
pub fn expand_env(input: &str) -> Result<String, String> {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder = PLACEHOLDER.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\)\s*)?\}\}"#).expect("must be valid regex")
    });

    let mut lines = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
            continue;
        }

        let mut failure = None;
        let expanded = placeholder.replace_all(line, |captures: &Captures<'_>| {
            let key = &captures[1];
            let fallback = captures.get(2).map(|m| m.as_str());

            let Some(name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
                failure.get_or_insert_with(|| format!("only variables scoped with 'env.' are supported: `{key}`"));
                return String::new();
            };

            match (std::env::var(name), fallback) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.to_owned(),
                (Err(_), None) => {
                    failure.get_or_insert_with(|| format!("environment variable not found: `{name}`"));
                    String::new()
                }
            }
        });

        if let Some(message) = failure {
            return Err(message);
        }

        lines.push(expanded.into_owned());
    }

    Ok(lines.join("\n"))
}

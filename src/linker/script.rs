//! Linker script templating.
//!
//! The template references variables as `${NAME}` or `$NAME`. Values come
//! from the driver's environment overlaid with the unit's own overrides, so
//! `${BASE_ADDRESS}` resolves to the placement of the unit about to be built.

use crate::config::LinkerScriptConfig;
use crate::error::TemplateError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

static VAR_REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("Invalid variable reference regex")
});

/// Replace every variable reference in `template` using `lookup`.
pub fn substitute<F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in VAR_REF_REGEX.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let value = lookup(name).ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&value);
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Render `config.template` into `config.output` for one unit.
pub fn render_linker_script(
    config: &LinkerScriptConfig,
    overrides: &BTreeMap<String, String>,
) -> Result<PathBuf, TemplateError> {
    let template = fs::read_to_string(&config.template).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TemplateError::TemplateNotFound(config.template.clone())
        } else {
            TemplateError::IoError(e)
        }
    })?;

    let process_env: HashMap<String, String> = std::env::vars().collect();
    let rendered = substitute(&template, |name| {
        overrides
            .get(name)
            .or_else(|| process_env.get(name))
            .cloned()
    })?;

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&config.output, rendered)?;

    log::debug!(
        "Rendered {} -> {}",
        config.template.display(),
        config.output.display()
    );
    Ok(config.output.clone())
}

//! Parsing options, the declaration file location and environment overrides.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::error::Result;
use crate::registry::Registry;

/// Default path of the YAML declaration file read by the command-line front end.
const DEFAULT_DECLARATION_PATH: &str = "~/.argtable/params.yml";

/// Resolves the declaration file path.
///
/// Uses the given path when there is one and the default path otherwise. Shell expansions
/// like `~` are resolved.
///
/// # Examples
///
/// ```
/// use argtable_core::config::get_declaration_path;
///
/// let custom_path = get_declaration_path(&Some("/path/to/params.yml".to_string()));
/// assert_eq!(custom_path, "/path/to/params.yml");
/// ```
pub fn get_declaration_path(declaration_path_arg: &Option<String>) -> String {
    let declaration_path = match declaration_path_arg {
        Some(declaration_path) => declaration_path,
        None => DEFAULT_DECLARATION_PATH,
    };

    shellexpand::tilde(declaration_path).to_string()
}

/// Which environment variables may override declared defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvOverride {
    #[default]
    Disabled,
    /// A variable named exactly like the main name: `verbose`.
    Exact,
    /// The prefix, an underscore and the upper-cased main name: `MYAPP_VERBOSE`.
    Prefixed(String),
}

impl EnvOverride {
    /// The variable consulted for a parameter, if any.
    #[must_use]
    pub fn variable_name(&self, main_name: &str) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::Exact => Some(main_name.to_string()),
            Self::Prefixed(prefix) => Some(format!("{prefix}_{}", main_name.to_uppercase())),
        }
    }
}

/// How an argument vector is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub short_prefix: String,
    pub long_prefix: String,
    /// Separates a switch from its value inside one token: `--name=value`.
    pub assignment: String,
    pub allow_nameless_positionals: bool,
    /// Adds a `help`/`h` switch that prints the usage text.
    pub auto_help: bool,
    /// Adds a `bash_autocomplete` switch that prints a completion script.
    pub auto_autocomplete: bool,
    pub guess_short_names: bool,
    pub env_override: EnvOverride,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            short_prefix: "-".to_string(),
            long_prefix: "--".to_string(),
            assignment: "=".to_string(),
            allow_nameless_positionals: true,
            auto_help: true,
            auto_autocomplete: true,
            guess_short_names: false,
            env_override: EnvOverride::Disabled,
        }
    }
}

/// The process environment, skipping variables whose name or value is not valid UTF-8.
pub fn env_vars() -> Vec<(String, String)> {
    utf8_vars(env::vars_os())
}

fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Vec<(String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                warn!("Skipping environment variable `{key}`: value is not valid UTF-8");
                None
            }
            (Err(key), _) => {
                warn!("Skipping environment variable {key:?}: name is not valid UTF-8");
                None
            }
        })
        .collect()
}

/// Applies environment variables to the registry as one batch.
///
/// Sequence parameters split the variable on whitespace. Returns how many parameters were
/// overridden.
///
/// # Errors
///
/// Returns [`Error::ValueNotAllowed`](crate::error::Error::ValueNotAllowed) if a variable
/// holds a value its parameter rejects; nothing is applied then.
pub fn apply_env_overrides(
    registry: &mut Registry,
    policy: &EnvOverride,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<usize> {
    if *policy == EnvOverride::Disabled {
        return Ok(0);
    }

    let vars: HashMap<String, String> = vars.into_iter().collect();
    let mut values = IndexMap::new();

    for (name, param) in registry.entries() {
        let Some(variable) = policy.variable_name(name.main_name()) else {
            continue;
        };
        let Some(text) = vars.get(&variable) else {
            continue;
        };

        let tokens: Vec<&str> = if param.is_sequence() {
            text.split_whitespace().collect()
        } else {
            vec![text.as_str()]
        };
        debug!("Environment variable `{variable}` overrides `{name}`");
        let _ = values.insert(name.main_name().to_string(), param.value_from_text(&tokens));
    }

    registry.update_values(&values)?;
    if !values.is_empty() {
        info!("Applied {} environment overrides", values.len());
    }

    Ok(values.len())
}

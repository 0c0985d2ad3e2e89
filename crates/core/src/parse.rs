//! The one-call entry point: declarations and an argument vector in, typed values out.

use indexmap::IndexMap;
use log::{debug, info};

use crate::argv::ArgvParser;
use crate::config::{apply_env_overrides, env_vars, ParseOptions};
use crate::declaration::ParamMap;
use crate::error::{Error, Result};
use crate::help::{render_bash_autocomplete, render_help};
use crate::registry::Registry;
use crate::value::Value;

pub const HELP_SWITCH: &str = "help";
pub const HELP_SHORT_SWITCH: &str = "h";
pub const AUTOCOMPLETE_SWITCH: &str = "bash_autocomplete";

/// Values parsed from an argument vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub program: String,
    /// Main name to resolved value, in declaration order.
    pub values: IndexMap<String, Value>,
    pub positionals: Vec<String>,
    /// The usage text, rendered with the parsed values.
    pub help: String,
}

impl Parsed {
    /// # Errors
    ///
    /// [`Error::NameNotFound`] if there is no value under that main name.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T> {
        let value = self.get(name)?;
        extract(value).ok_or_else(|| Error::value_not_allowed(value.repr(), expected).for_param(name))
    }

    /// # Errors
    ///
    /// [`Error::NameNotFound`], or [`Error::ValueNotAllowed`] if the value has another type.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.typed(name, "bool", Value::as_bool)
    }

    /// # Errors
    ///
    /// [`Error::NameNotFound`], or [`Error::ValueNotAllowed`] if the value has another type.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        self.typed(name, "int", Value::as_int)
    }

    /// # Errors
    ///
    /// [`Error::NameNotFound`], or [`Error::ValueNotAllowed`] if the value is not a number.
    pub fn get_float(&self, name: &str) -> Result<f64> {
        self.typed(name, "float", Value::as_float)
    }

    /// # Errors
    ///
    /// [`Error::NameNotFound`], or [`Error::ValueNotAllowed`] if the value has another type.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.typed(name, "str", Value::as_str)
    }

    /// # Errors
    ///
    /// [`Error::NameNotFound`], or [`Error::ValueNotAllowed`] if the value is not a sequence.
    pub fn get_list(&self, name: &str) -> Result<&[Value]> {
        self.typed(name, "sequence", Value::as_list)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Parsed),
    /// The help switch was given; holds the usage text.
    Help(String),
    /// The autocomplete switch was given; holds the bash script.
    Autocomplete(String),
}

/// Which automatic switches were added, as opposed to declared by the user.
#[derive(Debug, Clone, Copy, Default)]
struct AutoSwitches {
    help: bool,
    autocomplete: bool,
}

fn add_auto_switches(registry: &mut Registry, options: &ParseOptions) -> Result<AutoSwitches> {
    let mut added = AutoSwitches::default();

    if options.auto_help && !registry.contains(HELP_SWITCH) {
        let mut variants = vec![HELP_SWITCH];
        if !registry.contains(HELP_SHORT_SWITCH) {
            variants.push(HELP_SHORT_SWITCH);
        }
        registry.insert(variants, (false, "Print this help and exit"))?;
        added.help = true;
    }

    if options.auto_autocomplete && !registry.contains(AUTOCOMPLETE_SWITCH) {
        registry.insert(
            AUTOCOMPLETE_SWITCH,
            (false, "Print a bash completion script and exit"),
        )?;
        added.autocomplete = true;
    }

    debug!("Automatic switches: {added:?}");
    Ok(added)
}

/// Builds a registry from `map` and parses `argv` (program name first) against it, with
/// environment overrides taken from the process environment.
///
/// # Errors
///
/// Any declaration error while building the registry, or any error of [`parse_registry`].
///
/// # Examples
///
/// ```
/// use argtable_core::config::ParseOptions;
/// use argtable_core::declaration::ParamMap;
/// use argtable_core::parse::{parse, ParseOutcome};
///
/// let map = ParamMap::new()
///     .with(["count", "c"], (1, "How many"))
///     .with("out", "{count}.txt");
/// let outcome = parse(map, &["prog", "-c", "3"], &ParseOptions::default())?;
///
/// let ParseOutcome::Parsed(parsed) = outcome else {
///     panic!("expected values");
/// };
/// assert_eq!(parsed.get_int("count")?, 3);
/// assert_eq!(parsed.get_str("out")?, "3.txt");
/// # Ok::<(), argtable_core::error::Error>(())
/// ```
pub fn parse<S: AsRef<str>>(
    map: ParamMap,
    argv: &[S],
    options: &ParseOptions,
) -> Result<ParseOutcome> {
    let registry = Registry::from_map(map)?;
    parse_registry(&registry, argv, options, env_vars())
}

/// Parses `argv` against a copy of `registry`; the registry itself is left untouched.
///
/// Order of application: defaults, environment overrides, then the argument vector.
///
/// # Errors
///
/// - [`Error::ArgvSyntax`], [`Error::NameNotFound`] or [`Error::MissingValue`] for a malformed
///   argument vector
/// - [`Error::ValueNotAllowed`] for a value its parameter rejects
/// - [`Error::CircularReference`] if reference strings form a cycle
pub fn parse_registry<S: AsRef<str>>(
    registry: &Registry,
    argv: &[S],
    options: &ParseOptions,
    env_vars: impl IntoIterator<Item = (String, String)>,
) -> Result<ParseOutcome> {
    let mut registry = registry.copy();

    let auto = add_auto_switches(&mut registry, options)?;
    if options.guess_short_names {
        let guessed = registry.add_guessed_short_names();
        debug!("Guessed {guessed} short names");
    }

    let _ = apply_env_overrides(&mut registry, &options.env_override, env_vars)?;

    let split = ArgvParser::new(options).split(&registry, argv)?;

    let mut candidates = IndexMap::new();
    for (name, tokens) in &split.assignments {
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let candidate = registry.get_param(name)?.value_from_text(&tokens);
        let _ = candidates.insert(name.clone(), candidate);
    }
    registry.update_values(&candidates)?;

    let help = render_help(&registry, &split.program, options)?;

    if auto.help && registry.get(HELP_SWITCH)? == Value::Bool(true) {
        info!("Help requested");
        return Ok(ParseOutcome::Help(help));
    }
    if auto.autocomplete && registry.get(AUTOCOMPLETE_SWITCH)? == Value::Bool(true) {
        info!("Bash autocomplete requested");
        return Ok(ParseOutcome::Autocomplete(render_bash_autocomplete(
            &registry,
            &split.program,
            options,
        )));
    }

    let mut values = registry.export()?;
    if auto.help {
        let _ = values.shift_remove(HELP_SWITCH);
    }
    if auto.autocomplete {
        let _ = values.shift_remove(AUTOCOMPLETE_SWITCH);
    }

    Ok(ParseOutcome::Parsed(Parsed {
        program: split.program,
        values,
        positionals: split.positionals,
        help,
    }))
}

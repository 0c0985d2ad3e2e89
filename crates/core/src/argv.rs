//! Splitting an argument vector into switch assignments and positionals.
//!
//! The registry is used only to know which names exist and which of them are booleans or
//! sequences; values stay text until the caller converts them.

use indexmap::IndexMap;
use log::debug;

use crate::config::ParseOptions;
use crate::error::{Error, Result};
use crate::registry::Registry;

/// Text forms a boolean switch accepts as its value. Any other token after a boolean switch is
/// a positional.
const BOOL_TOKENS: [&str; 6] = ["true", "false", "t", "f", "1", "0"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitArgv {
    pub program: String,
    /// Main name to the text values given for it, in order of first appearance.
    pub assignments: IndexMap<String, Vec<String>>,
    pub positionals: Vec<String>,
}

/// The switch currently collecting values.
struct Pending {
    main_name: String,
    values: Vec<String>,
    is_bool: bool,
    is_sequence: bool,
}

pub struct ArgvParser<'a> {
    options: &'a ParseOptions,
}

impl<'a> ArgvParser<'a> {
    #[must_use]
    pub fn new(options: &'a ParseOptions) -> Self {
        Self { options }
    }

    fn is_switch(&self, token: &str) -> bool {
        match token.strip_prefix(self.options.short_prefix.as_str()) {
            Some(rest) => rest
                .chars()
                .next()
                .is_some_and(|first| !first.is_ascii_digit() && first != '.'),
            None => false,
        }
    }

    /// Splits `argv` (program name first).
    ///
    /// # Errors
    ///
    /// - [`Error::ArgvSyntax`] for an empty vector, a program name that looks like a switch, a
    ///   short name used with the long prefix, or positionals when they are not allowed
    /// - [`Error::NameNotFound`] for an unknown switch
    /// - [`Error::MissingValue`] for a non-boolean switch given without a value
    pub fn split<S: AsRef<str>>(&self, registry: &Registry, argv: &[S]) -> Result<SplitArgv> {
        let Some((program, tokens)) = argv.split_first() else {
            return Err(Error::ArgvSyntax(
                "the argument vector must contain the program name".to_string(),
            ));
        };
        let program = program.as_ref();
        if self.is_switch(program) {
            return Err(Error::ArgvSyntax(format!(
                "the program name `{program}` looks like a switch"
            )));
        }

        let mut split = SplitArgv {
            program: program.to_string(),
            ..SplitArgv::default()
        };
        let mut pending: Option<Pending> = None;
        let mut switches_done = false;

        for token in tokens.iter().map(AsRef::as_ref) {
            if switches_done {
                split.positionals.push(token.to_string());
                continue;
            }

            if token == self.options.long_prefix {
                Self::flush(&mut split, pending.take())?;
                switches_done = true;
                continue;
            }

            if self.is_switch(token) {
                Self::flush(&mut split, pending.take())?;
                pending = self.start_switch(registry, token, &mut split)?;
                continue;
            }

            let Some(current) = pending.as_mut() else {
                split.positionals.push(token.to_string());
                continue;
            };

            if token == self.options.assignment && current.values.is_empty() {
                continue;
            }

            if current.is_sequence {
                current.values.push(token.to_string());
            } else if current.is_bool && !BOOL_TOKENS.contains(&token.to_lowercase().as_str()) {
                Self::flush(&mut split, pending.take())?;
                split.positionals.push(token.to_string());
            } else {
                current.values.push(token.to_string());
                Self::flush(&mut split, pending.take())?;
            }
        }
        Self::flush(&mut split, pending.take())?;

        if !self.options.allow_nameless_positionals && !split.positionals.is_empty() {
            return Err(Error::ArgvSyntax(format!(
                "unexpected positional arguments: {}",
                split.positionals.join(" ")
            )));
        }

        debug!(
            "Split argv into {} assignments and {} positionals",
            split.assignments.len(),
            split.positionals.len()
        );
        Ok(split)
    }

    /// Reads one switch token. Returns the switch when it still expects values.
    fn start_switch(
        &self,
        registry: &Registry,
        token: &str,
        split: &mut SplitArgv,
    ) -> Result<Option<Pending>> {
        let (used_long, body) = match token.strip_prefix(self.options.long_prefix.as_str()) {
            Some(body) => (true, body),
            None => (
                false,
                token
                    .strip_prefix(self.options.short_prefix.as_str())
                    .unwrap_or(token),
            ),
        };

        let (name, inline_value) = match body.split_once(self.options.assignment.as_str()) {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        if registry.contains(name) {
            if used_long && name.chars().count() == 1 {
                return Err(Error::ArgvSyntax(format!(
                    "short name `{name}` used with `{}`; use `{}{name}`",
                    self.options.long_prefix, self.options.short_prefix
                )));
            }

            let param = registry.get_param(name)?;
            let pending = Pending {
                main_name: registry.get_name(name)?.main_name().to_string(),
                values: inline_value.map(str::to_string).into_iter().collect(),
                is_bool: param.is_bool(),
                is_sequence: param.is_sequence(),
            };

            if inline_value.is_some() && !pending.is_sequence {
                Self::flush(split, Some(pending))?;
                return Ok(None);
            }
            return Ok(Some(pending));
        }

        if !used_long && inline_value.is_none() && self.is_bool_bundle(registry, name) {
            for short_name in name.chars() {
                let main_name = registry.get_name(&short_name.to_string())?.main_name();
                let _ = split
                    .assignments
                    .insert(main_name.to_string(), vec!["true".to_string()]);
            }
            return Ok(None);
        }

        Err(Error::NameNotFound(name.to_string()))
    }

    fn is_bool_bundle(&self, registry: &Registry, bundle: &str) -> bool {
        bundle.chars().count() > 1
            && bundle.chars().all(|short_name| {
                let short_name = short_name.to_string();
                registry.get_short_names().contains(&short_name.as_str())
                    && registry
                        .get_param(&short_name)
                        .is_ok_and(|param| param.is_bool())
            })
    }

    fn flush(split: &mut SplitArgv, pending: Option<Pending>) -> Result<()> {
        let Some(pending) = pending else {
            return Ok(());
        };

        if pending.values.is_empty() && !pending.is_bool && !pending.is_sequence {
            return Err(Error::MissingValue(pending.main_name));
        }

        let _ = split.assignments.insert(pending.main_name, pending.values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::sequence;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert(["verbose", "v"], false).unwrap();
        registry.insert(["all", "a"], false).unwrap();
        registry.insert(["count", "c"], 1).unwrap();
        registry.insert("name", "anon").unwrap();
        registry.insert(["files", "f"], sequence(["x"])).unwrap();
        registry.insert("offset", 0.0).unwrap();
        registry
    }

    fn split(argv: &[&str]) -> Result<SplitArgv> {
        ArgvParser::new(&ParseOptions::default()).split(&registry(), argv)
    }

    fn assignment(split: &SplitArgv, name: &str) -> Vec<String> {
        split.assignments[name].clone()
    }

    #[test]
    fn test_equals_and_space_forms() {
        let result = split(&["prog", "--count=3", "--name", "bob"]).unwrap();
        assert_eq!(result.program, "prog");
        assert_eq!(assignment(&result, "count"), ["3"]);
        assert_eq!(assignment(&result, "name"), ["bob"]);
        assert!(result.positionals.is_empty());

        let result = split(&["prog", "--name", "=", "bob"]).unwrap();
        assert_eq!(assignment(&result, "name"), ["bob"]);
    }

    #[test]
    fn test_aliases_map_to_main_name() {
        let result = split(&["prog", "-c", "4"]).unwrap();
        assert_eq!(assignment(&result, "count"), ["4"]);
        let result = split(&["prog", "-name=x"]).unwrap();
        assert_eq!(assignment(&result, "name"), ["x"]);
    }

    #[test]
    fn test_bool_switch_without_value() {
        let result = split(&["prog", "-v", "input.txt"]).unwrap();
        assert_eq!(assignment(&result, "verbose"), Vec::<String>::new());
        assert_eq!(result.positionals, ["input.txt"]);

        let result = split(&["prog", "--verbose", "False"]).unwrap();
        assert_eq!(assignment(&result, "verbose"), ["False"]);
    }

    #[test]
    fn test_short_bundle() {
        let result = split(&["prog", "-va"]).unwrap();
        assert_eq!(assignment(&result, "verbose"), ["true"]);
        assert_eq!(assignment(&result, "all"), ["true"]);

        assert!(matches!(
            split(&["prog", "-vc"]),
            Err(Error::NameNotFound(_))
        ));
    }

    #[test]
    fn test_sequence_consumes_following_values() {
        let result = split(&["prog", "--files", "a", "b", "-v"]).unwrap();
        assert_eq!(assignment(&result, "files"), ["a", "b"]);
        assert_eq!(assignment(&result, "verbose"), Vec::<String>::new());
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let result = split(&["prog", "--offset", "-1.5", "-c", "-2"]).unwrap();
        assert_eq!(assignment(&result, "offset"), ["-1.5"]);
        assert_eq!(assignment(&result, "count"), ["-2"]);
    }

    #[test]
    fn test_double_dash_ends_switches() {
        let result = split(&["prog", "-c", "1", "--", "--name", "x"]).unwrap();
        assert_eq!(result.positionals, ["--name", "x"]);
        assert!(!result.assignments.contains_key("name"));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let result = split(&["prog", "--count=1", "-c", "2"]).unwrap();
        assert_eq!(assignment(&result, "count"), ["2"]);
    }

    #[test]
    fn test_extra_values_become_positionals() {
        let result = split(&["prog", "--count", "1", "2", "3"]).unwrap();
        assert_eq!(assignment(&result, "count"), ["1"]);
        assert_eq!(result.positionals, ["2", "3"]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            split(&["prog", "--count"]),
            Err(Error::MissingValue(ref name)) if name == "count"
        ));
        assert!(matches!(
            split(&["prog", "--c", "1"]),
            Err(Error::ArgvSyntax(_))
        ));
        assert!(matches!(
            split(&["prog", "--unknown", "1"]),
            Err(Error::NameNotFound(ref name)) if name == "unknown"
        ));
        assert!(matches!(split(&["-prog"]), Err(Error::ArgvSyntax(_))));
        let empty: [&str; 0] = [];
        assert!(matches!(split(&empty), Err(Error::ArgvSyntax(_))));
    }

    #[test]
    fn test_positionals_can_be_forbidden() {
        let options = ParseOptions {
            allow_nameless_positionals: false,
            ..ParseOptions::default()
        };
        let result = ArgvParser::new(&options).split(&registry(), &["prog", "stray"]);
        assert!(matches!(result, Err(Error::ArgvSyntax(_))));
    }

    #[test]
    fn test_custom_prefixes() {
        let options = ParseOptions {
            short_prefix: "/".to_string(),
            long_prefix: "//".to_string(),
            assignment: ":".to_string(),
            ..ParseOptions::default()
        };
        let result = ArgvParser::new(&options)
            .split(&registry(), &["prog", "//count:5", "/v"])
            .unwrap();
        assert_eq!(assignment(&result, "count"), ["5"]);
        assert!(result.assignments.contains_key("verbose"));
    }
}

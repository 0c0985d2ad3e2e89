//! Printing parsed values.

use argtable_core::error::{Error, Result};
use argtable_core::parse::Parsed;
use argtable_core::value::Value;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::cli_args::Format;

#[derive(Debug, Serialize)]
struct Report<'a> {
    values: &'a IndexMap<String, Value>,
    positionals: &'a [String],
}

/// Renders the parsed values in the requested format.
///
/// # Errors
///
/// Returns [`Error::Yaml`] if the values cannot be serialized.
pub fn render(parsed: &Parsed, format: Format) -> Result<String> {
    match format {
        Format::Plain => Ok(render_plain(parsed)),
        Format::Yaml => render_yaml(parsed),
    }
}

fn render_plain(parsed: &Parsed) -> String {
    let width = parsed.values.keys().map(String::len).max().unwrap_or(0);
    let mut output = parsed
        .values
        .iter()
        .map(|(name, value)| format!("{name:<width$} = {value}\n"))
        .join("");

    if !parsed.positionals.is_empty() {
        output.push_str(&format!(
            "\npositionals: {}\n",
            parsed.positionals.iter().join(" ")
        ));
    }
    output
}

fn render_yaml(parsed: &Parsed) -> Result<String> {
    let report = Report {
        values: &parsed.values,
        positionals: &parsed.positionals,
    };
    serde_yaml::to_string(&report).map_err(|e| {
        Error::yaml_error(
            "writing".to_string(),
            "output".to_string(),
            "<stdout>".to_string(),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(positionals: &[&str]) -> Parsed {
        let mut values = IndexMap::new();
        values.insert("verbose".to_string(), Value::Bool(true));
        values.insert("count".to_string(), Value::Int(3));
        values.insert("out".to_string(), Value::from("a.txt"));
        values.insert(
            "tags".to_string(),
            Value::List(vec![Value::from("x"), Value::from("y")]),
        );
        Parsed {
            program: "tool".to_string(),
            values,
            positionals: positionals.iter().map(ToString::to_string).collect(),
            help: String::new(),
        }
    }

    #[test]
    fn test_render_plain() {
        let output = render(&parsed(&[]), Format::Plain).unwrap();
        assert_eq!(
            output,
            "verbose = True\ncount   = 3\nout     = a.txt\ntags    = ['x', 'y']\n"
        );
    }

    #[test]
    fn test_render_plain_with_positionals() {
        let output = render(&parsed(&["in.csv", "more"]), Format::Plain).unwrap();
        assert!(output.ends_with("\npositionals: in.csv more\n"));
    }

    #[test]
    fn test_render_yaml() {
        let output = render(&parsed(&["in.csv"]), Format::Yaml).unwrap();
        let document: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();

        assert_eq!(document["values"]["verbose"], serde_yaml::Value::Bool(true));
        assert_eq!(document["values"]["count"], serde_yaml::Value::from(3));
        assert_eq!(document["values"]["out"], serde_yaml::Value::from("a.txt"));
        assert_eq!(document["values"]["tags"][1], serde_yaml::Value::from("y"));
        assert_eq!(document["positionals"][0], serde_yaml::Value::from("in.csv"));
    }
}

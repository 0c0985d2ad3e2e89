//! Reading parameter declarations from YAML.
//!
//! A declaration file is a list of entries:
//!
//! ```yaml
//! - names: [verbose, v]
//!   default: false
//!   help: Print more
//! - names: depth
//!   kind: int
//!   default: 2
//!   range: [0, 10]
//! - names: mode
//!   choices: [fast, slow]
//! - names: tags
//!   kind: sequence
//!   default: [a, b]
//!   element_type: str
//!   min_len: 1
//!   ordered: false
//! ```
//!
//! When `kind` is absent it is inferred from `choices` or from the type of `default`.

use std::fs::File;

use log::debug;
use serde::Deserialize;

use crate::declaration::{Declaration, ParamMap};
use crate::error::{Error, Result};
use crate::interpolation::has_references;
use crate::param::{Collection, ElementType, Param};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    fn into_variants(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }

    fn main_name(&self) -> &str {
        match self {
            Self::One(name) => name,
            Self::Many(names) => names.first().map_or("", String::as_str),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Int,
    Float,
    Str,
    Ref,
    Choice,
    Sequence,
    Literal,
    Src,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamEntry {
    pub names: Names,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub kind: Option<ParamType>,
    #[serde(default)]
    pub choices: Option<Vec<serde_yaml::Value>>,
    #[serde(default)]
    pub range: Option<[serde_yaml::Number; 2]>,
    #[serde(default)]
    pub element_type: Option<ElementType>,
    #[serde(default)]
    pub min_len: Option<usize>,
    #[serde(default)]
    pub ordered: Option<bool>,
}

fn yaml_to_value(yaml: &serde_yaml::Value) -> Result<Value> {
    Ok(match yaml {
        serde_yaml::Value::Null => Value::None,
        serde_yaml::Value::Bool(value) => Value::Bool(*value),
        serde_yaml::Value::Number(number) => number_to_value(number),
        serde_yaml::Value::String(text) => Value::Str(text.clone()),
        serde_yaml::Value::Sequence(items) => {
            Value::List(items.iter().map(yaml_to_value).collect::<Result<_>>()?)
        }
        serde_yaml::Value::Mapping(mapping) => Value::Dict(
            mapping
                .iter()
                .map(|(key, value)| Ok((yaml_to_value(key)?, yaml_to_value(value)?)))
                .collect::<Result<_>>()?,
        ),
        serde_yaml::Value::Tagged(tagged) => {
            return Err(Error::InvalidDefinition(format!(
                "YAML tags are not supported: {}",
                tagged.tag
            )))
        }
    })
}

fn number_to_value(number: &serde_yaml::Number) -> Value {
    match number.as_i64() {
        Some(value) => Value::Int(value),
        None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
    }
}

impl ParamEntry {
    fn invalid(&self, reason: impl std::fmt::Display) -> Error {
        Error::InvalidDefinition(format!("`{}`: {reason}", self.names.main_name()))
    }

    fn inferred_type(&self, default: &Value) -> Result<ParamType> {
        if let Some(kind) = self.kind {
            return Ok(kind);
        }
        if self.choices.is_some() {
            return Ok(ParamType::Choice);
        }

        Ok(match default {
            Value::Bool(_) => ParamType::Bool,
            Value::Int(_) => ParamType::Int,
            Value::Float(_) => ParamType::Float,
            Value::Str(text) if has_references(text) => ParamType::Ref,
            Value::Str(_) => ParamType::Str,
            Value::List(_) => ParamType::Sequence,
            Value::None => return Err(self.invalid("either `kind` or `default` is required")),
            other => {
                return Err(self.invalid(format!(
                    "can not infer a parameter type from a {} default",
                    other.type_name()
                )))
            }
        })
    }

    fn default_text(&self, default: &Value) -> Result<String> {
        match default {
            Value::None => Ok(String::new()),
            Value::Str(text) => Ok(text.clone()),
            other => Err(self.invalid(format!("expected a string default, got {other}"))),
        }
    }

    fn build_param(&self) -> Result<Param> {
        let default = match &self.default {
            Some(yaml) => yaml_to_value(yaml)?,
            None => Value::None,
        };
        let kind = self.inferred_type(&default)?;

        if self.range.is_some() && !matches!(kind, ParamType::Int | ParamType::Float) {
            return Err(self.invalid("`range` only applies to int and float parameters"));
        }
        if self.choices.is_some() && kind != ParamType::Choice {
            return Err(self.invalid("`choices` only applies to choice parameters"));
        }

        let param = match kind {
            ParamType::Bool => match default {
                Value::None => Ok(Param::bool(false)),
                Value::Bool(value) => Ok(Param::bool(value)),
                other => Err(self.invalid(format!("expected a bool default, got {other}"))),
            },
            ParamType::Int => {
                let default = match default {
                    Value::None => 0,
                    Value::Int(value) => value,
                    other => {
                        return Err(self.invalid(format!("expected an int default, got {other}")))
                    }
                };
                match &self.range {
                    Some([min, max]) => {
                        let (Some(min), Some(max)) = (min.as_i64(), max.as_i64()) else {
                            return Err(self.invalid("an int range needs int bounds"));
                        };
                        Param::int_in_range(default, min, max)
                    }
                    None => Ok(Param::int(default)),
                }
            }
            ParamType::Float => {
                let default = match default {
                    Value::None => 0.0,
                    number @ (Value::Int(_) | Value::Float(_)) => number.as_float().unwrap_or_default(),
                    other => {
                        return Err(self.invalid(format!("expected a float default, got {other}")))
                    }
                };
                match &self.range {
                    Some([min, max]) => {
                        let (Some(min), Some(max)) = (min.as_f64(), max.as_f64()) else {
                            return Err(self.invalid("a float range needs numeric bounds"));
                        };
                        Param::float_in_range(default, min, max)
                    }
                    None => Ok(Param::float(default)),
                }
            }
            ParamType::Str => Ok(Param::str(self.default_text(&default)?)),
            ParamType::Ref => Ok(Param::str_ref(self.default_text(&default)?)),
            ParamType::Choice => {
                let Some(choices) = &self.choices else {
                    return Err(self.invalid("a choice needs `choices`"));
                };
                let mut choices = choices
                    .iter()
                    .map(yaml_to_value)
                    .collect::<Result<Vec<_>>>()?;
                if default != Value::None {
                    let Some(position) = choices.iter().position(|choice| *choice == default)
                    else {
                        return Err(Error::value_not_allowed(default.repr(), "choice")
                            .for_param(self.names.main_name()));
                    };
                    let default = choices.remove(position);
                    choices.insert(0, default);
                }
                Param::choice(choices)
            }
            ParamType::Sequence => {
                let elements = match default {
                    Value::None => Vec::new(),
                    Value::List(elements) => elements,
                    other => {
                        return Err(self.invalid(format!("expected a list default, got {other}")))
                    }
                };
                let collection = if self.ordered.unwrap_or(true) {
                    Collection::Ordered
                } else {
                    Collection::Unordered
                };
                Param::sequence(
                    elements,
                    self.element_type.unwrap_or_default(),
                    self.min_len.unwrap_or(0),
                    collection,
                )
            }
            ParamType::Literal => Param::literal(self.default_text(&default)?),
            ParamType::Src => Param::src(self.default_text(&default)?),
        };

        param.map_err(|error| error.for_param(self.names.main_name()))
    }

    /// Converts the entry into a name and a declaration for a [`ParamMap`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDefinition`] if the entry's fields do not fit together, or the
    /// construction error of the param it describes.
    pub fn into_declaration(self) -> Result<(Vec<String>, Declaration)> {
        let param = self.build_param()?;
        let mut declaration = Declaration::from(param);
        if let Some(help) = self.help {
            declaration = declaration.with_help(help);
        }
        Ok((self.names.into_variants(), declaration))
    }
}

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    File::open(path)
        .map_err(|e| Error::io_error(file_description.to_string(), path.to_string(), e))
}

/// Loads parameter declarations from a YAML file, in file order.
///
/// # Errors
///
/// Returns an error if:
/// - the file cannot be read
/// - the YAML is malformed or doesn't match the expected structure
/// - the file declares no parameters
/// - an entry does not describe a valid parameter
///
/// # Examples
///
/// ```no_run
/// use argtable_core::file_handling::get_param_definitions;
///
/// let map = get_param_definitions("/home/me/.argtable/params.yml")?;
/// println!("Loaded {} parameters", map.len());
/// # Ok::<(), argtable_core::error::Error>(())
/// ```
pub fn get_param_definitions(declaration_path: &str) -> Result<ParamMap> {
    let reader = get_reader("declaration", declaration_path)?;

    let entries: Vec<ParamEntry> = serde_yaml::from_reader(reader).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "declaration".to_string(),
            declaration_path.to_string(),
            e,
        )
    })?;

    if entries.is_empty() {
        return Err(Error::empty_definition(declaration_path.to_string()));
    }

    let mut map = ParamMap::new();
    for entry in entries {
        let (names, declaration) = entry.into_declaration()?;
        map.push(names, declaration);
    }

    debug!(
        "Loaded {} parameter declarations from `{declaration_path}`",
        map.len()
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamKind;
    use crate::registry::Registry;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{content}").unwrap();
        temp_file
    }

    fn load(content: &str) -> Result<ParamMap> {
        let temp_file = write_yaml(content);
        get_param_definitions(temp_file.path().to_str().unwrap())
    }

    fn entry(content: &str) -> ParamEntry {
        serde_yaml::from_str(content).unwrap()
    }

    #[test]
    fn test_inferred_kinds() {
        let cases = [
            ("names: a\ndefault: true", ParamKind::Bool),
            ("names: a\ndefault: 3", ParamKind::Int { range: None }),
            ("names: a\ndefault: 0.5", ParamKind::Float { range: None }),
            ("names: a\ndefault: plain", ParamKind::Str),
            ("names: a\ndefault: '{b}/c'", ParamKind::StrRef),
            (
                "names: a\nchoices: [x, y]",
                ParamKind::Choice {
                    choices: vec![Value::from("x"), Value::from("y")],
                },
            ),
        ];
        for (yaml, kind) in cases {
            assert_eq!(entry(yaml).build_param().unwrap().kind(), &kind, "{yaml}");
        }
    }

    #[test]
    fn test_explicit_kinds() {
        let param = entry("names: depth\nkind: int\ndefault: 2\nrange: [0, 10]")
            .build_param()
            .unwrap();
        assert_eq!(param.type_label(), "int in [0, 10]");

        let param = entry("names: ratio\nkind: float\ndefault: 1\nrange: [0, 1.5]")
            .build_param()
            .unwrap();
        assert_eq!(param.get_value().unwrap(), Value::Float(1.0));

        let param = entry("names: code\nkind: src\ndefault: '2 + 5'")
            .build_param()
            .unwrap();
        assert_eq!(param.get_value().unwrap(), Value::Int(7));

        let param = entry("names: flag\nkind: bool").build_param().unwrap();
        assert_eq!(param.get_value().unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_sequence_entry() {
        let param = entry(
            "names: tags\nkind: sequence\ndefault: [b, a, b]\nelement_type: str\nmin_len: 1\nordered: false",
        )
        .build_param()
        .unwrap();
        assert_eq!(
            param.get_value().unwrap(),
            Value::Set(vec![Value::from("b"), Value::from("a")])
        );

        let error = entry("names: xs\nkind: sequence\nelement_type: float\nmin_len: 2")
            .build_param()
            .unwrap_err();
        assert!(matches!(error, Error::ValueNotAllowed { name: Some(ref name), .. } if name == "xs"));
    }

    #[test]
    fn test_choice_default_moves_first() {
        let param = entry("names: mode\nchoices: [fast, slow]\ndefault: slow")
            .build_param()
            .unwrap();
        assert_eq!(param.get_value().unwrap(), Value::from("slow"));
        assert!(param.value_allowed("fast"));

        assert!(matches!(
            entry("names: mode\nchoices: [fast, slow]\ndefault: medium").build_param(),
            Err(Error::ValueNotAllowed { .. })
        ));
    }

    #[test]
    fn test_invalid_entries() {
        for yaml in [
            "names: a",
            "names: a\nkind: str\nrange: [0, 1]",
            "names: a\nkind: int\ndefault: many",
            "names: a\nkind: int\ndefault: 1\nrange: [0.5, 2]",
            "names: a\ndefault: {k: 1}",
            "names: a\nkind: bool\nchoices: [true]",
        ] {
            assert!(
                matches!(entry(yaml).build_param(), Err(Error::InvalidDefinition(_))),
                "{yaml}"
            );
        }
    }

    #[test]
    fn test_get_param_definitions_valid_yaml() {
        let map = load(
            r#"
- names: [verbose, v]
  default: false
  help: "Print more"
- names: root
  default: /tmp
- names: log
  default: "{root}/log.txt"
"#,
        )
        .unwrap();
        assert_eq!(map.len(), 3);

        let registry = Registry::from_map(map).unwrap();
        assert_eq!(registry.get_param("v").unwrap().description(), "Print more");
        assert_eq!(registry.get("log").unwrap(), Value::from("/tmp/log.txt"));
    }

    #[test]
    fn test_get_param_definitions_empty_file() {
        assert!(matches!(load("[]"), Err(Error::EmptyDefinition { .. })));
    }

    #[test]
    fn test_get_param_definitions_invalid_yaml() {
        assert!(matches!(
            load("invalid: yaml: content: ["),
            Err(Error::Yaml { .. })
        ));
        assert!(matches!(
            load("- names: a\n  unknown_field: 1"),
            Err(Error::Yaml { .. })
        ));
    }

    #[test]
    fn test_get_param_definitions_file_not_found() {
        assert!(matches!(
            get_param_definitions("/this/path/does/not/exist.yml"),
            Err(Error::Io { .. })
        ));
    }
}

use leon::{ParseError, RenderError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid name variants {}: {}", .name, .reason)]
    InvalidName { name: String, reason: String },

    #[error("Duplicate name variant: `{}` is already registered", .0)]
    DuplicateName(String),

    #[error(
        "Value `{}` is not allowed for {} parameter{}",
        .value,
        .expected,
        .name.as_ref().map(|name| format!(" `{name}`")).unwrap_or_default()
    )]
    ValueNotAllowed {
        name: Option<String>,
        value: String,
        expected: String,
    },

    #[error("Circular reference detected for parameter `{}`: {}", .name, .chain)]
    CircularReference { name: String, chain: String },

    #[error("No parameter is registered under the name `{}`", .0)]
    NameNotFound(String),

    #[error("Invalid parameter definition: {}", .0)]
    InvalidDefinition(String),

    #[error("Invalid argument vector: {}", .0)]
    ArgvSyntax(String),

    #[error("Parameter `{}` expects a value but none was given", .0)]
    MissingValue(String),

    #[error("Error parsing placeholder string: {}", .0)]
    Parse(#[from] ParseError),

    #[error("Error rendering placeholder template string: {}", .0)]
    Render(#[from] RenderError),

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("No parameters were found in the declaration YAML. Is `{}` empty?", .path)]
    EmptyDefinition { path: String },
}

impl Error {
    pub fn invalid_name(name: impl std::fmt::Debug, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: format!("{name:?}"),
            reason: reason.into(),
        }
    }

    pub fn value_not_allowed(value: impl ToString, expected: impl Into<String>) -> Self {
        Self::ValueNotAllowed {
            name: None,
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub fn circular_reference(name: &str, chain: &[&str]) -> Self {
        Self::CircularReference {
            name: name.to_string(),
            chain: chain.join(" -> "),
        }
    }

    pub fn empty_definition(path: String) -> Self {
        Self::EmptyDefinition { path }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    /// Attaches the parameter name to a [`Error::ValueNotAllowed`] raised below the registry,
    /// where only the parameter itself was known.
    #[must_use]
    pub fn for_param(self, param_name: &str) -> Self {
        match self {
            Self::ValueNotAllowed {
                name: None,
                value,
                expected,
            } => Self::ValueNotAllowed {
                name: Some(param_name.to_string()),
                value,
                expected,
            },
            other => other,
        }
    }

    /// Whether the error was caused by what the user typed on the command line, as opposed
    /// to a broken declaration. Front ends print the usage text for these.
    #[must_use]
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::ValueNotAllowed { .. }
                | Self::NameNotFound(_)
                | Self::ArgvSyntax(_)
                | Self::MissingValue(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_param_fills_missing_name() {
        let error = Error::value_not_allowed(11, "int").for_param("count");
        assert_eq!(
            error.to_string(),
            "Value `11` is not allowed for int parameter `count`"
        );
    }

    #[test]
    fn test_for_param_keeps_existing_name() {
        let error = Error::value_not_allowed(11, "int")
            .for_param("count")
            .for_param("other");
        assert!(matches!(
            error,
            Error::ValueNotAllowed { name: Some(ref name), .. } if name == "count"
        ));
    }

    #[test]
    fn test_circular_reference_chain() {
        let error = Error::circular_reference("a", &["a", "b", "a"]);
        assert_eq!(
            error.to_string(),
            "Circular reference detected for parameter `a`: a -> b -> a"
        );
    }

    #[test]
    fn test_is_user_input() {
        assert!(Error::MissingValue("x".to_string()).is_user_input());
        assert!(Error::NameNotFound("x".to_string()).is_user_input());
        assert!(!Error::DuplicateName("x".to_string()).is_user_input());
        assert!(!Error::InvalidDefinition("x".to_string()).is_user_input());
    }
}

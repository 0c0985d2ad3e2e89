//! Declarative parameter maps.
//!
//! A [`ParamMap`] lists parameters in declaration order, each as a name (one or more
//! variants) and a [`Declaration`]: a bare default, a default paired with help text, or a
//! prebuilt [`Param`].

use crate::error::Result;
use crate::interpolation::has_references;
use crate::param::{Collection, ElementType, Param};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Becomes a reference string when it contains a `{name}` placeholder.
    Str(String),
    /// Candidates of a choice, the first being the default.
    Choice(Vec<Value>),
    /// Default elements of an unordered sequence of strings.
    Sequence(Vec<Value>),
    Param(Param),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub value: DeclarationValue,
    pub help: Option<String>,
}

impl Declaration {
    #[must_use]
    pub fn new(value: DeclarationValue) -> Self {
        Self { value, help: None }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Shorthand for a [`DeclarationValue::Choice`].
pub fn choice<T: Into<Value>>(choices: impl IntoIterator<Item = T>) -> Declaration {
    Declaration::new(DeclarationValue::Choice(
        choices.into_iter().map(Into::into).collect(),
    ))
}

/// Shorthand for a [`DeclarationValue::Sequence`].
pub fn sequence<T: Into<Value>>(elements: impl IntoIterator<Item = T>) -> Declaration {
    Declaration::new(DeclarationValue::Sequence(
        elements.into_iter().map(Into::into).collect(),
    ))
}

impl From<DeclarationValue> for Declaration {
    fn from(value: DeclarationValue) -> Self {
        Self::new(value)
    }
}

impl From<bool> for Declaration {
    fn from(value: bool) -> Self {
        Self::new(DeclarationValue::Bool(value))
    }
}

impl From<i64> for Declaration {
    fn from(value: i64) -> Self {
        Self::new(DeclarationValue::Int(value))
    }
}

impl From<i32> for Declaration {
    fn from(value: i32) -> Self {
        Self::new(DeclarationValue::Int(i64::from(value)))
    }
}

impl From<f64> for Declaration {
    fn from(value: f64) -> Self {
        Self::new(DeclarationValue::Float(value))
    }
}

impl From<&str> for Declaration {
    fn from(value: &str) -> Self {
        Self::new(DeclarationValue::Str(value.to_string()))
    }
}

impl From<String> for Declaration {
    fn from(value: String) -> Self {
        Self::new(DeclarationValue::Str(value))
    }
}

impl From<Param> for Declaration {
    fn from(param: Param) -> Self {
        Self::new(DeclarationValue::Param(param))
    }
}

/// The `[default, help]` pair.
impl<T: Into<Declaration>> From<(T, &str)> for Declaration {
    fn from((value, help): (T, &str)) -> Self {
        value.into().with_help(help)
    }
}

impl Param {
    /// Builds the param variant a declaration stands for.
    ///
    /// # Errors
    ///
    /// Returns the construction error of the chosen variant, e.g.
    /// [`Error::InvalidDefinition`](crate::error::Error::InvalidDefinition) for an empty choice.
    pub fn from_declaration(declaration: Declaration) -> Result<Self> {
        let param = match declaration.value {
            DeclarationValue::Bool(value) => Self::bool(value),
            DeclarationValue::Int(value) => Self::int(value),
            DeclarationValue::Float(value) => Self::float(value),
            DeclarationValue::Str(value) if has_references(&value) => Self::str_ref(value),
            DeclarationValue::Str(value) => Self::str(value),
            DeclarationValue::Choice(choices) => Self::choice(choices)?,
            DeclarationValue::Sequence(elements) => {
                Self::sequence(elements, ElementType::Str, 0, Collection::Unordered)?
            }
            DeclarationValue::Param(param) => param,
        };

        Ok(match declaration.help {
            Some(help) => param.with_description(help),
            None => param,
        })
    }
}

/// Ordered parameter declarations, consumed by
/// [`Registry::from_map`](crate::registry::Registry::from_map).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(Vec<String>, Declaration)>,
}

impl ParamMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration under the given name variants.
    #[must_use]
    pub fn with(
        mut self,
        name: impl crate::name::NameVariants,
        declaration: impl Into<Declaration>,
    ) -> Self {
        self.push(name, declaration);
        self
    }

    pub fn push(
        &mut self,
        name: impl crate::name::NameVariants,
        declaration: impl Into<Declaration>,
    ) {
        self.entries
            .push((name.into_variants(), declaration.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Vec<String>, Declaration)> {
        self.entries.iter()
    }
}

impl IntoIterator for ParamMap {
    type Item = (Vec<String>, Declaration);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

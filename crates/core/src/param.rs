//! Typed parameters.
//!
//! A [`Param`] holds its declared default (the definition), its current value and a free text
//! description. What values it accepts is decided by its [`ParamKind`]. Reference strings are
//! resolved by the [`Registry`](crate::registry::Registry) that owns the param, which it knows
//! through the [`ParamHandle`] handed out at insertion.

use std::fmt::{Display, Formatter};

use leon::Template;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::expr::{eval_literal, eval_source};
use crate::value::Value;

/// Stable identifier a registry assigns to a param when it is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamHandle(pub(crate) usize);

impl ParamHandle {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element type of a sequence parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Bool,
    Int,
    Float,
    #[default]
    Str,
    Literal,
}

impl ElementType {
    fn label(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Literal => "literal",
        }
    }

    fn coerce(self, candidate: &Value) -> Option<Value> {
        match self {
            Self::Bool => coerce_bool(candidate),
            Self::Int => coerce_int(candidate, None),
            Self::Float => coerce_float(candidate, None),
            Self::Str => candidate.as_str().map(Value::from),
            Self::Literal => match candidate {
                Value::Str(text) => eval_literal(text).ok(),
                other => Some(other.clone()),
            },
        }
    }
}

/// Whether a sequence keeps the given order and duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collection {
    /// Stored as a list.
    #[default]
    Ordered,
    /// Stored as a set; duplicates are dropped before the length check.
    Unordered,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Bool,
    Int {
        range: Option<(i64, i64)>,
    },
    Float {
        range: Option<(f64, f64)>,
    },
    Str,
    /// A string whose `{name}` tokens are replaced by other parameters' values.
    StrRef,
    Choice {
        choices: Vec<Value>,
    },
    Sequence {
        element_type: ElementType,
        min_len: usize,
        collection: Collection,
    },
    /// Text of a literal constant, read back as the parsed value.
    Literal,
    /// Text of an arithmetic expression over literals, read back as its result.
    Src,
}

fn coerce_bool(candidate: &Value) -> Option<Value> {
    let value = match candidate {
        Value::Bool(value) => *value,
        Value::Int(1) => true,
        Value::Int(0) => false,
        Value::Float(value) if *value == 1.0 => true,
        Value::Float(value) if *value == 0.0 => false,
        Value::Str(text) => match text.trim().to_lowercase().as_str() {
            "true" | "t" | "1" => true,
            "false" | "f" | "0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(value))
}

/// Floats convert only when integral; `2.5` is rejected rather than truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn coerce_int(candidate: &Value, range: Option<(i64, i64)>) -> Option<Value> {
    let value = match candidate {
        Value::Bool(value) => i64::from(*value),
        Value::Int(value) => *value,
        Value::Float(value)
            if value.is_finite()
                && value.fract() == 0.0
                && *value >= i64::MIN as f64
                && *value < i64::MAX as f64 =>
        {
            *value as i64
        }
        Value::Str(text) => text.trim().parse().ok()?,
        _ => return None,
    };

    match range {
        Some((min, max)) if value < min || value > max => None,
        _ => Some(Value::Int(value)),
    }
}

fn coerce_float(candidate: &Value, range: Option<(f64, f64)>) -> Option<Value> {
    let value = match candidate {
        Value::Bool(value) => f64::from(u8::from(*value)),
        Value::Int(_) | Value::Float(_) => candidate.as_float()?,
        Value::Str(text) => text.trim().parse().ok()?,
        _ => return None,
    };

    match range {
        Some((min, max)) if !(min..=max).contains(&value) => None,
        _ => Some(Value::Float(value)),
    }
}

impl ParamKind {
    /// Returns the normalized form of `candidate` when this kind accepts it.
    #[must_use]
    pub fn coerce(&self, candidate: &Value) -> Option<Value> {
        match self {
            Self::Bool => coerce_bool(candidate),
            Self::Int { range } => coerce_int(candidate, *range),
            Self::Float { range } => coerce_float(candidate, *range),
            Self::Str => candidate.as_str().map(Value::from),
            Self::StrRef => {
                let text = candidate.as_str()?;
                Template::parse(text).ok()?;
                Some(Value::from(text))
            }
            Self::Choice { choices } => choices.contains(candidate).then(|| candidate.clone()),
            Self::Sequence {
                element_type,
                min_len,
                collection,
            } => {
                let mut elements = Vec::new();
                for element in candidate.as_list()? {
                    let element = element_type.coerce(element)?;
                    if *collection == Collection::Ordered || !elements.contains(&element) {
                        elements.push(element);
                    }
                }
                if elements.len() < *min_len {
                    return None;
                }
                Some(match collection {
                    Collection::Ordered => Value::List(elements),
                    Collection::Unordered => Value::Set(elements),
                })
            }
            Self::Literal => {
                let text = candidate.as_str()?;
                eval_literal(text).ok()?;
                Some(Value::from(text))
            }
            Self::Src => {
                let text = candidate.as_str()?;
                eval_source(text).ok()?;
                Some(Value::from(text))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    kind: ParamKind,
    definition: Value,
    value: Value,
    description: String,
    handle: Option<ParamHandle>,
}

impl Param {
    fn with_kind(kind: ParamKind, definition: Value) -> Self {
        Self {
            kind,
            value: definition.clone(),
            definition,
            description: String::new(),
            handle: None,
        }
    }

    /// Builds a param whose default has to pass the kind's own validation.
    fn validated(kind: ParamKind, default: Value) -> Result<Self> {
        match kind.coerce(&default) {
            Some(definition) => Ok(Self::with_kind(kind, definition)),
            None => {
                let label = Self::with_kind(kind, Value::None).type_label();
                Err(Error::value_not_allowed(default.repr(), label))
            }
        }
    }

    #[must_use]
    pub fn bool(default: bool) -> Self {
        Self::with_kind(ParamKind::Bool, Value::Bool(default))
    }

    #[must_use]
    pub fn int(default: i64) -> Self {
        Self::with_kind(ParamKind::Int { range: None }, Value::Int(default))
    }

    /// An integer limited to the inclusive range `min..=max`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDefinition`] if `min > max`, [`Error::ValueNotAllowed`] if the default
    /// lies outside the range.
    pub fn int_in_range(default: i64, min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidDefinition(format!(
                "empty range [{min}, {max}]"
            )));
        }
        Self::validated(
            ParamKind::Int {
                range: Some((min, max)),
            },
            Value::Int(default),
        )
    }

    #[must_use]
    pub fn float(default: f64) -> Self {
        Self::with_kind(ParamKind::Float { range: None }, Value::Float(default))
    }

    /// A float limited to the inclusive range `min..=max`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDefinition`] if the range is empty or not a number,
    /// [`Error::ValueNotAllowed`] if the default lies outside it.
    pub fn float_in_range(default: f64, min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(Error::InvalidDefinition(format!(
                "empty range [{min}, {max}]"
            )));
        }
        Self::validated(
            ParamKind::Float {
                range: Some((min, max)),
            },
            Value::Float(default),
        )
    }

    #[must_use]
    pub fn str(default: impl Into<String>) -> Self {
        Self::with_kind(ParamKind::Str, Value::Str(default.into()))
    }

    /// A reference string such as `"{out_dir}/log.txt"`.
    #[must_use]
    pub fn str_ref(default: impl Into<String>) -> Self {
        Self::with_kind(ParamKind::StrRef, Value::Str(default.into()))
    }

    /// A choice among fixed candidates; the first candidate is the default.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDefinition`] if there are no candidates.
    pub fn choice<T: Into<Value>>(choices: impl IntoIterator<Item = T>) -> Result<Self> {
        let choices: Vec<Value> = choices.into_iter().map(Into::into).collect();
        let Some(default) = choices.first().cloned() else {
            return Err(Error::InvalidDefinition(
                "a choice needs at least one candidate".to_string(),
            ));
        };
        Ok(Self::with_kind(ParamKind::Choice { choices }, default))
    }

    /// A sequence of values of one element type.
    ///
    /// # Errors
    ///
    /// [`Error::ValueNotAllowed`] if the default elements do not satisfy the element type or
    /// are fewer than `min_len`.
    pub fn sequence<T: Into<Value>>(
        elements: impl IntoIterator<Item = T>,
        element_type: ElementType,
        min_len: usize,
        collection: Collection,
    ) -> Result<Self> {
        let elements = elements.into_iter().map(Into::into).collect();
        Self::validated(
            ParamKind::Sequence {
                element_type,
                min_len,
                collection,
            },
            Value::List(elements),
        )
    }

    /// The text of a literal constant, e.g. `"[3, 1, 5]"`.
    ///
    /// # Errors
    ///
    /// [`Error::ValueNotAllowed`] if the text is not a literal.
    pub fn literal(text: impl Into<String>) -> Result<Self> {
        Self::validated(ParamKind::Literal, Value::Str(text.into()))
    }

    /// The text of an arithmetic expression over literals, e.g. `"2 ** 10"`.
    ///
    /// # Errors
    ///
    /// [`Error::ValueNotAllowed`] if the text does not evaluate.
    pub fn src(text: impl Into<String>) -> Result<Self> {
        Self::validated(ParamKind::Src, Value::Str(text.into()))
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn bind(&mut self, handle: ParamHandle) {
        self.handle = Some(handle);
    }

    pub(crate) fn raw_value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The handle assigned by the owning registry, if the param has been inserted.
    #[must_use]
    pub fn handle(&self) -> Option<ParamHandle> {
        self.handle
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.definition
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.kind, ParamKind::Bool)
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ParamKind::StrRef)
    }

    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, ParamKind::Sequence { .. })
    }

    pub fn value_allowed(&self, candidate: impl Into<Value>) -> bool {
        self.kind.coerce(&candidate.into()).is_some()
    }

    /// Validates and commits a new value, normalized to the param's type.
    ///
    /// # Errors
    ///
    /// [`Error::ValueNotAllowed`] if the candidate is rejected; the value is left untouched.
    pub fn update_value(&mut self, candidate: impl Into<Value>) -> Result<()> {
        let candidate = candidate.into();
        match self.kind.coerce(&candidate) {
            Some(value) => {
                self.value = value;
                Ok(())
            }
            None => Err(Error::value_not_allowed(candidate.repr(), self.type_label())),
        }
    }

    pub fn reset_to_default(&mut self) {
        self.value = self.definition.clone();
    }

    /// The current value. Literal and source params are evaluated; reference strings are
    /// returned unresolved (resolve them through the owning registry).
    ///
    /// # Errors
    ///
    /// [`Error::ValueNotAllowed`] if a literal or source text no longer evaluates.
    pub fn get_value(&self) -> Result<Value> {
        let evaluated = match (&self.kind, &self.value) {
            (ParamKind::Literal, Value::Str(text)) => eval_literal(text),
            (ParamKind::Src, Value::Str(text)) => eval_source(text),
            _ => return Ok(self.value.clone()),
        };

        evaluated.map_err(|message| {
            Error::value_not_allowed(self.value.repr(), format!("{} ({message})", self.type_label()))
        })
    }

    /// Short type description used in help output and errors.
    #[must_use]
    pub fn type_label(&self) -> String {
        match &self.kind {
            ParamKind::Bool => "bool".to_string(),
            ParamKind::Int { range: None } => "int".to_string(),
            ParamKind::Int {
                range: Some((min, max)),
            } => format!("int in [{min}, {max}]"),
            ParamKind::Float { range: None } => "float".to_string(),
            ParamKind::Float {
                range: Some((min, max)),
            } => format!("float in [{min}, {max}]"),
            ParamKind::Str => "str".to_string(),
            ParamKind::StrRef => "ref".to_string(),
            ParamKind::Choice { choices } => {
                let choices = choices.iter().map(Value::repr).collect::<Vec<_>>();
                format!("choice of {}", choices.join("|"))
            }
            ParamKind::Sequence {
                element_type,
                collection,
                ..
            } => match collection {
                Collection::Ordered => format!("list[{}]", element_type.label()),
                Collection::Unordered => format!("set[{}]", element_type.label()),
            },
            ParamKind::Literal => "literal".to_string(),
            ParamKind::Src => "src".to_string(),
        }
    }

    /// Turns the text tokens given for this param on the command line or in the environment
    /// into a candidate value. The candidate still has to pass [`Param::update_value`].
    #[must_use]
    pub fn value_from_text(&self, tokens: &[&str]) -> Value {
        match &self.kind {
            ParamKind::Sequence { .. } => {
                Value::List(tokens.iter().map(|token| Value::from(*token)).collect())
            }
            ParamKind::Bool if tokens.is_empty() => Value::Bool(true),
            ParamKind::Choice { choices } => {
                let text = tokens.join(" ");
                choices
                    .iter()
                    .find(|choice| choice.to_string() == text)
                    .cloned()
                    .unwrap_or(Value::Str(text))
            }
            _ => Value::Str(tokens.join(" ")),
        }
    }
}

impl Display for Param {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "<{}>", self.type_label())?;
        if !self.description.is_empty() {
            write!(formatter, " {}", self.description)?;
        }
        write!(formatter, " [default: {}]", self.definition.repr())?;
        if self.value != self.definition {
            write!(formatter, " [value: {}]", self.value.repr())?;
        }
        Ok(())
    }
}

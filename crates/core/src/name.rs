//! Parameter names and their aliases.
//!
//! A [`Name`] bundles the canonical (main) name of a parameter with its aliases. Aliases of
//! exactly one alphabetic character are short names (`-v`), everything else is a long
//! name (`--verbose`).

use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};

/// Returns true for non-empty ASCII identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_identifier(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn is_short_name(variant: &str) -> bool {
    variant.len() == 1 && variant.chars().all(|c| c.is_ascii_alphabetic())
}

/// Anything that can be turned into the ordered list of variants of a [`Name`].
///
/// Implemented for a single string as well as for arrays, slices and vectors of strings.
pub trait NameVariants {
    fn into_variants(self) -> Vec<String>;
}

impl NameVariants for &str {
    fn into_variants(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl NameVariants for String {
    fn into_variants(self) -> Vec<String> {
        vec![self]
    }
}

impl NameVariants for &String {
    fn into_variants(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl NameVariants for &[&str] {
    fn into_variants(self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl<const N: usize> NameVariants for [&str; N] {
    fn into_variants(self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl NameVariants for Vec<&str> {
    fn into_variants(self) -> Vec<String> {
        self.into_iter().map(ToString::to_string).collect()
    }
}

impl NameVariants for Vec<String> {
    fn into_variants(self) -> Vec<String> {
        self
    }
}

impl NameVariants for &[String] {
    fn into_variants(self) -> Vec<String> {
        self.to_vec()
    }
}

impl NameVariants for Name {
    fn into_variants(self) -> Vec<String> {
        self.variants
    }
}

/// The canonical name of a parameter plus its aliases.
///
/// The first variant given at construction is the main name and always stays first; the
/// remaining variants are kept sorted so that two names declared with the same aliases in a
/// different order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    variants: Vec<String>,
}

impl Name {
    /// Validates and normalizes name variants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if:
    /// - no variant is given
    /// - a variant is empty, non-ASCII or not an identifier
    /// - the same variant is given twice
    ///
    /// # Examples
    ///
    /// ```
    /// use argtable_core::name::Name;
    ///
    /// let name = Name::new(["test1", "_ask", "t", "dont_ask"])?;
    /// assert_eq!(name.main_name(), "test1");
    /// assert_eq!(name.variants(), ["test1", "_ask", "dont_ask", "t"]);
    /// # Ok::<(), argtable_core::error::Error>(())
    /// ```
    pub fn new(variants: impl NameVariants) -> Result<Self> {
        let variants = variants.into_variants();

        let Some((main_name, aliases)) = variants.split_first() else {
            return Err(Error::invalid_name(&variants, "at least one variant is required"));
        };

        for (index, variant) in variants.iter().enumerate() {
            if variant.is_empty() {
                return Err(Error::invalid_name(&variants, "variants may not be empty"));
            }
            if !variant.is_ascii() {
                return Err(Error::invalid_name(
                    &variants,
                    format!("`{variant}` contains non-ASCII characters"),
                ));
            }
            if !is_identifier(variant) {
                return Err(Error::invalid_name(
                    &variants,
                    format!("`{variant}` is not an identifier"),
                ));
            }
            if variants[..index].contains(variant) {
                return Err(Error::invalid_name(
                    &variants,
                    format!("`{variant}` is given more than once"),
                ));
            }
        }

        let mut aliases = aliases.to_vec();
        aliases.sort();

        let mut normalized = Vec::with_capacity(variants.len());
        normalized.push(main_name.clone());
        normalized.extend(aliases);

        Ok(Self {
            variants: normalized,
        })
    }

    #[must_use]
    pub fn main_name(&self) -> &str {
        &self.variants[0]
    }

    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Variants made of a single alphabetic character.
    pub fn short_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variants
            .iter()
            .map(String::as_str)
            .filter(|variant| is_short_name(variant))
    }

    #[must_use]
    pub fn has_short_name(&self) -> bool {
        self.short_names().next().is_some()
    }

    /// Appends an alias after the existing variants. Used when guessing short names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the variant is not an identifier, is a single
    /// non-alphabetic character, or is already one of this name's variants.
    pub fn append_variant(&mut self, variant: &str) -> Result<()> {
        let valid_length = is_short_name(variant) || variant.len() > 1;
        if !is_identifier(variant) || !valid_length {
            return Err(Error::invalid_name(
                &self.variants,
                format!("`{variant}` can not be appended as a variant"),
            ));
        }
        if self.variants.iter().any(|existing| existing == variant) {
            return Err(Error::invalid_name(
                &self.variants,
                format!("`{variant}` is already a variant"),
            ));
        }

        self.variants.push(variant.to_string());
        Ok(())
    }

    /// Human readable label: `"this_is_a_TEST"` becomes `"This Is A Test"`.
    #[must_use]
    pub fn caption(&self) -> String {
        self.main_name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_ascii_uppercase().to_string() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Every switch spelling, single character variants first: `-p,--param,--large_param`.
    #[must_use]
    pub fn cli_help_string(&self, short_separator: &str, long_separator: &str) -> String {
        let short = self
            .variants
            .iter()
            .filter(|variant| variant.len() == 1)
            .map(|variant| format!("{short_separator}{variant}"));
        let long = self
            .variants
            .iter()
            .filter(|variant| variant.len() > 1)
            .map(|variant| format!("{long_separator}{variant}"));

        short.chain(long).collect::<Vec<_>>().join(",")
    }
}

impl Display for Name {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.main_name())
    }
}

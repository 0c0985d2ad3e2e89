//! The parameter registry.
//!
//! Entries are kept in declaration order. Three indices map every name variant, every main
//! name and every short name to the entry position; they are rebuilt from scratch whenever the
//! entry list changes. Reference strings are resolved here, on every read, by walking the
//! live reference graph.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::declaration::{Declaration, ParamMap};
use crate::error::{Error, Result};
use crate::interpolation::{get_references, get_template, render};
use crate::name::{Name, NameVariants};
use crate::param::{Param, ParamHandle};
use crate::value::Value;

#[derive(Debug)]
struct Entry {
    name: Name,
    param: Param,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Entry>,
    all_names: IndexMap<String, usize>,
    main_names: IndexMap<String, usize>,
    short_names: IndexMap<String, usize>,
    handles: HashMap<ParamHandle, usize>,
    next_handle: usize,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from declarations, inserting them in order.
    ///
    /// # Errors
    ///
    /// The first error [`Registry::insert`] reports.
    pub fn from_map(map: ParamMap) -> Result<Self> {
        let mut registry = Self::new();
        for (name, declaration) in map {
            registry.insert(name, declaration)?;
        }
        Ok(registry)
    }

    /// Registers a parameter and returns its handle.
    ///
    /// Nothing changes when an error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] if the name variants are invalid
    /// - [`Error::DuplicateName`] if any variant is already registered
    /// - the construction error of the declared param variant
    pub fn insert(
        &mut self,
        name: impl NameVariants,
        declaration: impl Into<Declaration>,
    ) -> Result<ParamHandle> {
        let name = Name::new(name)?;

        if let Some(taken) = name
            .variants()
            .iter()
            .find(|variant| self.all_names.contains_key(variant.as_str()))
        {
            return Err(Error::DuplicateName(taken.clone()));
        }

        let param = Param::from_declaration(declaration.into())?;
        Ok(self.push_entry(name, param))
    }

    fn push_entry(&mut self, name: Name, mut param: Param) -> ParamHandle {
        let handle = ParamHandle(self.next_handle);
        self.next_handle += 1;
        param.bind(handle);

        debug!(
            "Registered parameter `{}` as {} ({:?})",
            name,
            param.type_label(),
            handle
        );

        self.entries.push(Entry { name, param });
        self.rebuild_indices();
        handle
    }

    fn rebuild_indices(&mut self) {
        self.all_names.clear();
        self.main_names.clear();
        self.short_names.clear();
        self.handles.clear();

        for (index, entry) in self.entries.iter().enumerate() {
            let _ = self
                .main_names
                .insert(entry.name.main_name().to_string(), index);
            for variant in entry.name.variants() {
                let _ = self.all_names.insert(variant.clone(), index);
            }
            for short_name in entry.name.short_names() {
                let _ = self.short_names.insert(short_name.to_string(), index);
            }
            if let Some(handle) = entry.param.handle() {
                let _ = self.handles.insert(handle, index);
            }
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.all_names
            .get(name)
            .copied()
            .ok_or_else(|| Error::NameNotFound(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.all_names.contains_key(name)
    }

    /// Looks a param up by any of its name variants.
    ///
    /// # Errors
    ///
    /// [`Error::NameNotFound`] if no entry has that variant.
    pub fn get_param(&self, name: &str) -> Result<&Param> {
        Ok(&self.entries[self.index_of(name)?].param)
    }

    /// The full [`Name`] registered under any of its variants.
    ///
    /// # Errors
    ///
    /// [`Error::NameNotFound`] if no entry has that variant.
    pub fn get_name(&self, name: &str) -> Result<&Name> {
        Ok(&self.entries[self.index_of(name)?].name)
    }

    #[must_use]
    pub fn get_name_of_param(&self, handle: ParamHandle) -> Option<&Name> {
        self.handles
            .get(&handle)
            .map(|&index| &self.entries[index].name)
    }

    /// The current value of a parameter, with references resolved.
    ///
    /// # Errors
    ///
    /// - [`Error::NameNotFound`] if the name is not registered
    /// - [`Error::CircularReference`] if resolution runs into a cycle
    /// - [`Error::ValueNotAllowed`] if a literal or source text no longer evaluates
    pub fn get(&self, name: &str) -> Result<Value> {
        let index = self.index_of(name)?;
        self.resolve(index, &mut IndexSet::new())
    }

    fn resolve(&self, index: usize, resolving: &mut IndexSet<String>) -> Result<Value> {
        let entry = &self.entries[index];
        let main_name = entry.name.main_name();
        if !entry.param.is_reference() {
            return entry
                .param
                .get_value()
                .map_err(|error| error.for_param(main_name));
        }

        if resolving.contains(main_name) {
            let mut chain: Vec<&str> = resolving.iter().map(String::as_str).collect();
            chain.push(main_name);
            return Err(Error::circular_reference(main_name, &chain));
        }

        let Value::Str(text) = entry.param.raw_value() else {
            return entry.param.get_value();
        };

        let template = get_template(text)?;
        let _ = resolving.insert(main_name.to_string());
        let substituted = self.substitute(&template, resolving);
        let _ = resolving.shift_remove(main_name);

        Ok(Value::Str(substituted?))
    }

    /// Renders a template, resolving registered names and putting the others back as typed.
    fn substitute(
        &self,
        template: &leon::Template,
        resolving: &mut IndexSet<String>,
    ) -> Result<String> {
        let references = get_references(template);
        let mut context = HashMap::new();

        for key in template.keys() {
            let key = (*key).to_string();
            let replacement = match self.all_names.get(&key) {
                Some(&referenced) if references.contains(&key) => {
                    self.resolve(referenced, resolving)?.to_string()
                }
                _ => format!("{{{key}}}"),
            };
            let _ = context.insert(key, replacement);
        }

        render(template, &context)
    }

    /// Validates and commits a new value for one parameter.
    ///
    /// # Errors
    ///
    /// [`Error::NameNotFound`] or [`Error::ValueNotAllowed`]; the value is left untouched.
    pub fn set(&mut self, name: &str, candidate: impl Into<Value>) -> Result<()> {
        let index = self.index_of(name)?;
        let entry = &mut self.entries[index];
        entry
            .param
            .update_value(candidate)
            .map_err(|error| error.for_param(entry.name.main_name()))?;
        debug!("Set parameter `{}`", entry.name);
        Ok(())
    }

    /// Whether `candidate` would be accepted by the named parameter. Unknown names are not.
    pub fn value_allowed(&self, name: &str, candidate: impl Into<Value>) -> bool {
        self.get_param(name)
            .is_ok_and(|param| param.value_allowed(candidate))
    }

    /// Whether every value of the batch would be accepted.
    #[must_use]
    pub fn values_allowed(&self, values: &IndexMap<String, Value>) -> bool {
        values
            .iter()
            .all(|(name, value)| self.value_allowed(name, value))
    }

    /// Applies a batch of values, all or nothing.
    ///
    /// # Errors
    ///
    /// The first [`Error::NameNotFound`] or [`Error::ValueNotAllowed`]; no value of the batch
    /// is applied in that case.
    pub fn update_values(&mut self, values: &IndexMap<String, Value>) -> Result<()> {
        for (name, value) in values {
            let index = self.index_of(name)?;
            let entry = &self.entries[index];
            if !entry.param.value_allowed(value) {
                return Err(Error::value_not_allowed(value.repr(), entry.param.type_label())
                    .for_param(entry.name.main_name()));
            }
        }

        for (name, value) in values {
            self.set(name, value)?;
        }

        debug!("Applied {} values", values.len());
        Ok(())
    }

    /// Gives every parameter without a short name the first letter of its main name, when
    /// that letter is not taken. Returns how many short names were added.
    pub fn add_guessed_short_names(&mut self) -> usize {
        let mut added = 0;

        for index in 0..self.entries.len() {
            let name = &mut self.entries[index].name;
            if name.has_short_name() {
                continue;
            }

            let Some(first) = name
                .main_name()
                .chars()
                .next()
                .filter(char::is_ascii_alphabetic)
            else {
                continue;
            };

            let short_name = first.to_string();
            if self.all_names.contains_key(&short_name) {
                debug!("Short name `{short_name}` for `{name}` is taken");
                continue;
            }

            if name.append_variant(&short_name).is_ok() {
                debug!("Guessed short name `{short_name}` for `{name}`");
                let _ = self.all_names.insert(short_name, index);
                added += 1;
            }
        }

        self.rebuild_indices();
        added
    }

    /// An independent registry with the same declarations and current values.
    ///
    /// Params are deep copies; they keep their handles, which the new registry indexes on
    /// its own.
    #[must_use]
    pub fn copy(&self) -> Self {
        let mut copy = Self {
            next_handle: self.next_handle,
            ..Self::default()
        };

        for entry in &self.entries {
            copy.entries.push(Entry {
                name: entry.name.clone(),
                param: entry.param.clone(),
            });
        }

        copy.rebuild_indices();
        copy
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.rebuild_indices();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Param)> {
        self.entries.iter().map(|entry| (&entry.name, &entry.param))
    }

    #[must_use]
    pub fn get_all_names(&self) -> Vec<&str> {
        self.all_names.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn get_main_names(&self) -> Vec<&str> {
        self.main_names.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn get_short_names(&self) -> Vec<&str> {
        self.short_names.keys().map(String::as_str).collect()
    }

    /// Every main name with its resolved value, in declaration order.
    ///
    /// # Errors
    ///
    /// The first error resolving a value reports.
    pub fn export(&self) -> Result<IndexMap<String, Value>> {
        self.main_names
            .iter()
            .map(|(name, &index)| {
                self.resolve(index, &mut IndexSet::new())
                    .map(|value| (name.clone(), value))
            })
            .collect()
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        self.copy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{choice, sequence};

    fn scenario() -> Registry {
        Registry::from_map(
            ParamMap::new()
                .with("p1", "P1")
                .with("ref1", "R1({p1})")
                .with("ref2", "R2({ref1}) R2({p1})"),
        )
        .unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let registry = scenario();
        assert_eq!(registry.get("p1").unwrap(), Value::from("P1"));
        assert_eq!(registry.get("ref1").unwrap(), Value::from("R1(P1)"));
        assert_eq!(
            registry.get("ref2").unwrap(),
            Value::from("R2(R1(P1)) R2(P1)")
        );
    }

    #[test]
    fn test_resolution_is_idempotent_and_live() {
        let mut registry = scenario();
        let first = registry.get("ref2").unwrap();
        assert_eq!(registry.get("ref2").unwrap(), first);

        registry.set("p1", "X").unwrap();
        assert_eq!(registry.get("ref2").unwrap(), Value::from("R2(R1(X)) R2(X)"));
    }

    #[test]
    fn test_two_node_cycle() {
        let mut registry = Registry::new();
        registry.insert("ref1", "{ref2}").unwrap();
        registry.insert("ref2", "{ref1}").unwrap();
        for name in ["ref1", "ref2"] {
            assert!(matches!(
                registry.get(name),
                Err(Error::CircularReference { .. })
            ));
        }
    }

    #[test]
    fn test_triangular_cycle() {
        let mut registry = Registry::new();
        registry.insert("ref1", "{ref2}").unwrap();
        registry.insert("ref2", "{ref3}").unwrap();
        registry.insert("ref3", "{ref1}").unwrap();

        let error = registry.get("ref1").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Circular reference detected for parameter `ref1`: ref1 -> ref2 -> ref3 -> ref1"
        );
    }

    #[test]
    fn test_self_reference() {
        let mut registry = Registry::new();
        registry.insert("me", "{me}").unwrap();
        assert!(matches!(
            registry.get("me"),
            Err(Error::CircularReference { .. })
        ));
    }

    #[test]
    fn test_cycle_closed_by_later_insert() {
        let mut registry = Registry::new();
        registry.insert("a", "A({b})").unwrap();
        assert_eq!(registry.get("a").unwrap(), Value::from("A({b})"));

        registry.insert("b", "B({a})").unwrap();
        assert!(matches!(
            registry.get("a"),
            Err(Error::CircularReference { .. })
        ));
    }

    #[test]
    fn test_forward_reference_stays_literal() {
        let mut registry = Registry::new();
        registry.insert("ref", "R1({p2})").unwrap();
        assert_eq!(registry.get("ref").unwrap(), Value::from("R1({p2})"));
    }

    #[test]
    fn test_reference_through_alias() {
        let mut registry = Registry::new();
        registry.insert(["output", "o"], "out").unwrap();
        registry.insert("log", "{o}/log.txt").unwrap();
        assert_eq!(registry.get("log").unwrap(), Value::from("out/log.txt"));
    }

    #[test]
    fn test_reference_to_other_kinds() {
        let mut registry = Registry::new();
        registry.insert("mode", choice(["fast", "slow"])).unwrap();
        registry
            .insert("size", Param::src("2 ** 4").unwrap())
            .unwrap();
        registry.insert("ratio", 0.5).unwrap();
        registry.insert("verbose", true).unwrap();
        registry
            .insert("label", "{mode}-{size}-{ratio}-{verbose}")
            .unwrap();

        assert_eq!(
            registry.get("label").unwrap(),
            Value::from("fast-16-0.5-True")
        );

        registry.set("mode", "slow").unwrap();
        registry.set("size", "3 * 3").unwrap();
        assert_eq!(
            registry.get("label").unwrap(),
            Value::from("slow-9-0.5-True")
        );
    }

    #[test]
    fn test_primitive_round_trip() {
        let mut registry = Registry::new();
        registry.insert("flag", true).unwrap();
        registry.insert("count", 3).unwrap();
        registry.insert("ratio", 0.25).unwrap();
        registry.insert("text", "plain").unwrap();

        assert_eq!(registry.get("flag").unwrap(), Value::Bool(true));
        assert_eq!(registry.get("count").unwrap(), Value::Int(3));
        assert_eq!(registry.get("ratio").unwrap(), Value::Float(0.25));
        assert_eq!(registry.get("text").unwrap(), Value::from("plain"));
    }

    #[test]
    fn test_duplicate_insert_is_atomic() {
        let mut registry = Registry::new();
        registry.insert("name", 1).unwrap();
        let before = registry.len();

        assert!(matches!(
            registry.insert("name", 2),
            Err(Error::DuplicateName(_))
        ));
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("name").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_alias_collisions_are_duplicates() {
        let mut registry = Registry::new();
        registry.insert(["verbose", "v"], false).unwrap();

        assert!(matches!(
            registry.insert(["version", "v"], false),
            Err(Error::DuplicateName(ref name)) if name == "v"
        ));
        assert!(matches!(
            registry.insert(["v"], 1),
            Err(Error::DuplicateName(_))
        ));
        assert!(!registry.contains("version"));
        assert_eq!(registry.get_all_names(), ["verbose", "v"]);
    }

    #[test]
    fn test_invalid_declarations_leave_registry_untouched() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.insert("1bad", 1),
            Err(Error::InvalidName { .. })
        ));
        let empty: Vec<Value> = Vec::new();
        assert!(matches!(
            registry.insert("options", choice(empty)),
            Err(Error::InvalidDefinition(_))
        ));
        assert!(registry.is_empty());
        assert!(registry.get_all_names().is_empty());
    }

    #[test]
    fn test_lookup_by_any_variant() {
        let mut registry = Registry::new();
        let handle = registry.insert(["input", "in_file", "i"], "a.txt").unwrap();

        for variant in ["input", "in_file", "i"] {
            assert_eq!(registry.get(variant).unwrap(), Value::from("a.txt"));
        }
        assert_eq!(registry.get_name("i").unwrap().main_name(), "input");
        assert_eq!(
            registry.get_name_of_param(handle).unwrap().main_name(),
            "input"
        );
        assert_eq!(registry.get_param("in_file").unwrap().handle(), Some(handle));
        assert!(matches!(
            registry.get("missing"),
            Err(Error::NameNotFound(_))
        ));
    }

    #[test]
    fn test_set_validates() {
        let mut registry = Registry::new();
        registry
            .insert("level", Param::int_in_range(0, 0, 10).unwrap())
            .unwrap();

        let error = registry.set("level", 11).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Value `11` is not allowed for int in [0, 10] parameter `level`"
        );
        assert_eq!(registry.get("level").unwrap(), Value::Int(0));

        registry.set("level", "10").unwrap();
        assert_eq!(registry.get("level").unwrap(), Value::Int(10));
        assert!(registry.value_allowed("level", 5));
        assert!(!registry.value_allowed("unknown", 5));
    }

    #[test]
    fn test_update_values_is_all_or_nothing() {
        let mut registry = Registry::new();
        registry.insert("count", 1).unwrap();
        registry.insert("mode", choice(["a", "b"])).unwrap();

        let bad = IndexMap::from([
            ("count".to_string(), Value::Int(5)),
            ("mode".to_string(), Value::from("z")),
        ]);
        assert!(!registry.values_allowed(&bad));
        assert!(matches!(
            registry.update_values(&bad),
            Err(Error::ValueNotAllowed { .. })
        ));
        assert_eq!(registry.get("count").unwrap(), Value::Int(1));

        let unknown = IndexMap::from([("nope".to_string(), Value::Int(5))]);
        assert!(!registry.values_allowed(&unknown));
        assert!(matches!(
            registry.update_values(&unknown),
            Err(Error::NameNotFound(_))
        ));

        let good = IndexMap::from([
            ("count".to_string(), Value::from("7")),
            ("mode".to_string(), Value::from("b")),
        ]);
        assert!(registry.values_allowed(&good));
        registry.update_values(&good).unwrap();
        assert_eq!(registry.get("count").unwrap(), Value::Int(7));
        assert_eq!(registry.get("mode").unwrap(), Value::from("b"));
    }

    #[test]
    fn test_add_guessed_short_names() {
        let mut registry = Registry::new();
        registry.insert("alpha", 1).unwrap();
        registry.insert("apple", 2).unwrap();
        registry.insert(["beta", "x"], 3).unwrap();
        registry.insert("_hidden", 4).unwrap();
        registry.insert("c", 5).unwrap();
        registry.insert("charlie", 6).unwrap();

        assert_eq!(registry.add_guessed_short_names(), 1);
        assert_eq!(registry.get_short_names(), ["a", "x", "c"]);
        assert_eq!(registry.get_name("a").unwrap().main_name(), "alpha");
        assert!(!registry.get_name("apple").unwrap().has_short_name());
        assert!(!registry.get_name("charlie").unwrap().has_short_name());
    }

    #[test]
    fn test_copy_is_independent() {
        let original = scenario();
        let mut copy = original.copy();
        copy.set("p1", "Changed").unwrap();

        assert_eq!(original.get("ref1").unwrap(), Value::from("R1(P1)"));
        assert_eq!(copy.get("ref1").unwrap(), Value::from("R1(Changed)"));

        let handle = original.get_param("ref2").unwrap().handle().unwrap();
        assert_eq!(copy.get_name_of_param(handle).unwrap().main_name(), "ref2");

        let cloned = copy.clone();
        assert_eq!(cloned.get("ref2").unwrap(), copy.get("ref2").unwrap());
    }

    #[test]
    fn test_clear_and_orders() {
        let mut registry = Registry::new();
        registry.insert(["zeta", "z"], 1).unwrap();
        registry.insert(["alpha", "long_alpha"], 2).unwrap();
        registry.insert("words", sequence(["a"])).unwrap();

        assert_eq!(registry.get_main_names(), ["zeta", "alpha", "words"]);
        assert_eq!(
            registry.get_all_names(),
            ["zeta", "z", "alpha", "long_alpha", "words"]
        );
        let exported: Vec<_> = registry.export().unwrap().into_keys().collect();
        assert_eq!(exported, ["zeta", "alpha", "words"]);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get_main_names().is_empty());
        assert!(registry.insert("zeta", 1).is_ok());
    }
}

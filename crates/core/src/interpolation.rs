use std::collections::HashMap;

use indexmap::IndexSet;
use leon::Template;

use crate::error::Result;
use crate::name::is_identifier;

pub fn get_template(text: &str) -> Result<Template<'_>> {
    Ok(Template::parse(text)?)
}

/// Find all parameter references in a template, in order of first appearance.
///
/// Only identifier keys count as references; anything else inside braces is left alone.
pub fn get_references(template: &Template) -> IndexSet<String> {
    let mut references = IndexSet::new();

    for key in template.keys() {
        if is_identifier(key) {
            let _ = references.insert((*key).to_string());
        }
    }

    references
}

/// Whether `text` contains at least one `{identifier}` placeholder.
#[must_use]
pub fn has_references(text: &str) -> bool {
    get_template(text)
        .map(|template| !get_references(&template).is_empty())
        .unwrap_or(false)
}

/// Substitutes every key of the template. Keys missing from `context` are an error, so
/// callers put unresolved names back as `{name}` themselves.
pub fn render(template: &Template, context: &HashMap<String, String>) -> Result<String> {
    Ok(template.render(context)?)
}

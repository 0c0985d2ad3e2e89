//! Usage text and bash completion scripts.

use std::fmt::Write;
use std::path::Path;

use crate::config::ParseOptions;
use crate::error::Result;
use crate::registry::Registry;

/// Renders the usage text: one line per parameter in declaration order, with its switches,
/// type, description, default and, for reference strings, the resolved value.
///
/// # Errors
///
/// Returns the error resolving a reference string reports, e.g. a circular reference.
pub fn render_help(registry: &Registry, program: &str, options: &ParseOptions) -> Result<String> {
    let switches: Vec<String> = registry
        .entries()
        .map(|(name, _)| name.cli_help_string(&options.short_prefix, &options.long_prefix))
        .collect();
    let width = switches.iter().map(String::len).max().unwrap_or(0);

    let mut help = format!("Usage: {program} [OPTIONS]");
    if options.allow_nameless_positionals {
        help.push_str(" [ARGS]...");
    }
    help.push_str("\n\nOptions:\n");

    for ((name, param), switch) in registry.entries().zip(&switches) {
        let _ = write!(help, "  {switch:<width$}  {param}");
        if param.is_reference() {
            let resolved = registry.get(name.main_name())?;
            let _ = write!(help, " -> {}", resolved.repr());
        }
        help.push('\n');
    }

    Ok(help)
}

/// Renders a bash script completing every switch spelling of the program.
///
/// Enable it with `source <(program --bash_autocomplete)`.
#[must_use]
pub fn render_bash_autocomplete(
    registry: &Registry,
    program_path: &str,
    options: &ParseOptions,
) -> String {
    let program = Path::new(program_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program_path);
    let function_name: String = program
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let words = registry
        .get_all_names()
        .into_iter()
        .map(|name| {
            if name.len() == 1 {
                format!("{}{name}", options.short_prefix)
            } else {
                format!("{}{name}", options.long_prefix)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"# bash completion for {program}
#
# Enable in the current shell:
#   source <({program_path} {long}bash_autocomplete)
_{function_name}_complete() {{
    local cur="${{COMP_WORDS[COMP_CWORD]}}"
    COMPREPLY=( $(compgen -W "{words}" -- "${{cur}}") )
    return 0
}}
complete -F _{function_name}_complete {program}
"#,
        long = options.long_prefix,
    )
}

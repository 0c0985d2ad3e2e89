use argtable_cli::cli_args::Args;
use argtable_cli::output;
use argtable_core::config::{self, ParseOptions};
use argtable_core::error::Result;
use argtable_core::file_handling;
use argtable_core::help::render_help;
use argtable_core::parse::{parse_registry, ParseOutcome};
use argtable_core::registry::Registry;
use clap::Parser;
use log::{debug, warn};
use std::process::ExitCode;

/// Load the parameter declarations into a registry
fn initialize_registry(args: &Args) -> Result<Registry> {
    let declaration_path = config::get_declaration_path(&args.declarations);
    debug!("Declaration path: `{declaration_path}`");

    let map = file_handling::get_param_definitions(&declaration_path)?;
    Registry::from_map(map)
}

/// Print the usage text to stderr after a mistake on the command line
fn print_usage_hint(registry: &Registry, program: &str, options: &ParseOptions) {
    match render_help(registry, program, options) {
        Ok(help) => eprintln!("{help}"),
        Err(e) => warn!("Could not render the usage text: {e}"),
    }
}

fn execute() -> Result<()> {
    let args = Args::parse();
    let registry = initialize_registry(&args)?;
    let options = args.parse_options();
    let argv = args.full_argv();

    let outcome = match parse_registry(&registry, &argv, &options, config::env_vars()) {
        Ok(outcome) => outcome,
        Err(e) if e.is_user_input() => {
            print_usage_hint(&registry, &args.program, &options);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    match outcome {
        ParseOutcome::Help(help) => print!("{help}"),
        ParseOutcome::Autocomplete(script) => print!("{script}"),
        ParseOutcome::Parsed(parsed) => print!("{}", output::render(&parsed, args.format)?),
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

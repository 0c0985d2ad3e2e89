//! Command-line argument parsing for the `argtable` binary.
//!
//! The binary's own options are parsed with `clap`; everything after `--` is the argument
//! vector handed to the declared parameters.

use argtable_core::config::{EnvOverride, ParseOptions};
use clap::{Parser, ValueEnum};

/// Environment prefix used when `--env-prefix` is not given.
pub const DEFAULT_ENV_PREFIX: &str = "ARGTABLE";

/// How parsed values are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One `name = value` line per parameter.
    Plain,
    /// A YAML mapping with `values` and `positionals`.
    Yaml,
}

/// Command-line arguments for the argtable CLI tool.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use argtable_cli::cli_args::Args;
///
/// let args = Args::parse_from(["argtable", "--declarations", "params.yml", "--", "-v", "--count=3"]);
/// assert_eq!(args.full_argv(), ["argtable", "-v", "--count=3"]);
/// ```
#[derive(Parser, Debug)] // requires `derive` feature
#[command(term_width = 0)] // Just to make testing across clap features easier
pub struct Args {
    /// Path to the parameter declaration YAML.
    ///
    /// If not provided, defaults to `~/.argtable/params.yml`.
    #[arg(long, short = 'd')]
    pub declarations: Option<String>,

    /// Program name shown in the usage text and the completion script.
    #[arg(long, short = 'p', default_value = "argtable")]
    pub program: String,

    /// Output format for the parsed values.
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Plain)]
    pub format: Format,

    /// Ignore environment variables when resolving defaults.
    #[arg(long, action, conflicts_with = "env_prefix")]
    pub no_env: bool,

    /// Prefix of the environment variables overriding defaults.
    ///
    /// A parameter `count` is read from `<PREFIX>_COUNT`. Defaults to `ARGTABLE`.
    #[arg(long)]
    pub env_prefix: Option<String>,

    /// Give each parameter without a short name the first letter of its main name.
    #[arg(long, short = 'g', action)]
    pub guess_short_names: bool,

    /// Arguments parsed against the declared parameters.
    ///
    /// # Examples
    /// ```bash
    /// argtable --declarations params.yml -- --count 3 -v input.txt
    /// ```
    #[arg(last = true)]
    pub argv: Vec<String>,
}

impl Args {
    /// The argument vector to parse, program name first.
    #[must_use]
    pub fn full_argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.argv.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn env_override(&self) -> EnvOverride {
        if self.no_env {
            return EnvOverride::Disabled;
        }
        let prefix = self
            .env_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string());
        EnvOverride::Prefixed(prefix)
    }

    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            guess_short_names: self.guess_short_names,
            env_override: self.env_override(),
            ..ParseOptions::default()
        }
    }
}

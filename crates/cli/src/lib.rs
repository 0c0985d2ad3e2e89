//! Argtable CLI Library
//!
//! This crate provides the command-line front end for argtable. It loads a YAML file of
//! parameter declarations, parses an argument vector against it and prints the resolved
//! values.
//!
//! # Key Features
//!
//! - **Declaration Files**: Parameters declared once in YAML, see
//!   [`argtable_core::file_handling`]
//! - **Output Formats**: Plain `name = value` lines or a YAML document
//! - **Environment Overrides**: `<PREFIX>_<NAME>` variables override declared defaults
//! - **Usage Text and Completion**: `--help` and `--bash_autocomplete` after `--`
//!
//! # Architecture
//!
//! - [`cli_args`]: The binary's own options and the trailing argument vector
//! - [`output`]: Rendering parsed values
//!
//! # Examples
//!
//! ```bash
//! # Parse with the default declaration file (~/.argtable/params.yml)
//! argtable -- --count 3 -v input.txt
//!
//! # Custom declaration file and YAML output
//! argtable --declarations params.yml --format yaml -- --mode fast
//!
//! # Usage text of the declared parameters
//! argtable --declarations params.yml --program mytool -- --help
//!
//! # Enable completion for a script wrapping argtable
//! source <(argtable --declarations params.yml --program mytool -- --bash_autocomplete)
//! ```

pub mod cli_args;
pub mod output;

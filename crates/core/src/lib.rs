//! Argtable Core Library
//!
//! This crate provides the core of argtable, a command-line argument parser built around a
//! registry of typed, named parameters. Parameters are declared once (a default, optional
//! help text and constraints) and the registry turns an argument vector into validated,
//! typed values.
//!
//! # Key Features
//!
//! - **Names**: A canonical name per parameter plus long and single-letter aliases
//! - **Typed Parameters**: bool, int and float (optionally ranged), strings, choices,
//!   sequences, literal constants and restricted arithmetic expressions
//! - **Reference Strings**: `{name}` placeholders resolved against other parameters on every
//!   read, with cycle detection
//! - **Argument Splitting**: `--name=value`, `--name value`, short bundles like `-vx`
//! - **Help and Completion**: A usage text and a bash completion script
//! - **Environment Overrides**: Defaults overridden from environment variables
//! - **Declaration Files**: Parameters declared in YAML
//!
//! # Examples
//!
//! ```
//! use argtable_core::registry::Registry;
//! use argtable_core::value::Value;
//!
//! let mut registry = Registry::new();
//! registry.insert("p1", "P1")?;
//! registry.insert("ref1", "R1({p1})")?;
//! registry.insert("ref2", "R2({ref1}) R2({p1})")?;
//!
//! assert_eq!(registry.get("ref2")?, Value::from("R2(R1(P1)) R2(P1)"));
//! # Ok::<(), argtable_core::error::Error>(())
//! ```

pub mod argv;
pub mod config;
pub mod declaration;
pub mod error;
pub mod expr;
pub mod file_handling;
pub mod help;
pub mod interpolation;
pub mod name;
pub mod param;
pub mod parse;
pub mod registry;
pub mod value;

pub use parse::parse;

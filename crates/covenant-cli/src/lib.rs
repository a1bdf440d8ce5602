//! Covenant CLI library.
//!
//! This library provides the core functionality for the `covenant` command-line
//! interface: configuration loading, backend selection, command execution and
//! output formatting.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use output::Formatter;

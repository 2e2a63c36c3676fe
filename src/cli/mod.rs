//! Command-line interface.
//!
//! Argument parsing and command execution for the `insurag` binary.

mod commands;
mod output;
mod parser;

pub use commands::execute;
pub use output::{OutputFormat, format_chunks, format_error};
pub use parser::{Cli, Commands};

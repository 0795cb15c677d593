//! simfs shell - line-oriented front end for `simfs-core`.
//!
//! This crate handles:
//! - Command tokenization and dispatch (`Shell`)
//! - Output through the `ShellConsole` trait, so tests can capture it
//! - Prompt and help text rendering

pub mod console;
pub mod shell;

pub use console::{BufferConsole, ShellConsole, StdConsole};
pub use shell::{Flow, Shell};

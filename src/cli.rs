//! CLI argument parsing and command dispatch

pub mod args;
pub mod check;
pub mod common;
pub mod list;

pub use args::{Cli, ColorChoice, Command, OutputFormat};

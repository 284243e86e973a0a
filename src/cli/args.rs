//! CLI argument parsing using clap

use crate::types::Level;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for vellum commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when stdout is a terminal
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}

impl ColorChoice {
    /// Resolve against the actual stdout
    pub fn for_stdout(self) -> termcolor::ColorChoice {
        match self {
            ColorChoice::Always => termcolor::ColorChoice::Always,
            ColorChoice::Never => termcolor::ColorChoice::Never,
            ColorChoice::Auto if std::io::stdout().is_terminal() => termcolor::ColorChoice::Auto,
            ColorChoice::Auto => termcolor::ColorChoice::Never,
        }
    }
}

/// Vellum CLI main entry point
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(about = "A syntax-aware linter for prose")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Output coloring
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Configuration file
    #[arg(long, global = true, default_value = "vellum.toml")]
    pub config: PathBuf,
}

/// Available vellum subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lint files and directories
    Check {
        /// Paths to check (defaults to current directory)
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Rule filter expression, file, or asset name
        #[arg(long)]
        filter: Option<String>,

        /// Lowest alert level to report
        #[arg(long)]
        min_level: Option<Level>,

        /// Report files that were skipped
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the active rules
    List {
        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Rule filter expression, file, or asset name
        #[arg(long)]
        filter: Option<String>,
    },
}

#![forbid(unsafe_code)]

//! Vellum: a syntax-aware linter for prose
//!
//! Vellum extracts the prose from Markdown, markup, structured data and
//! source-code comments, runs YAML-defined style rules over it, and reports
//! every alert at its line and column in the original file.
//!
//! ```no_run
//! use vellum::{Config, Linter, RuleManager};
//!
//! let config = Config::load("vellum.toml")?;
//! let rules = RuleManager::new(&config).build()?;
//! let linter = Linter::new(config, rules)?;
//! let file = linter.lint_file(std::path::Path::new("README.md"))?;
//! for alert in &file.alerts {
//!     println!("{}:{} {}", alert.line, alert.span.0, alert.message);
//! }
//! # Ok::<(), vellum::VellumError>(())
//! ```

pub mod blueprint;
pub mod cli;
pub mod code;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod position;
pub mod rules;
pub mod transform;
pub mod types;

pub use config::Config;
pub use engine::{ExecutionEngine, ExecutionResult, Linter};
pub use error::{ConfigError, LintError, RuleError, VellumError};
pub use model::{Alert, Block, File};
pub use rules::{RuleManager, RuleSet};
pub use types::{Format, Level, ScopeSet, Selector};

//! Error types for Vellum
//!
//! Errors are split by blast radius. `ConfigError` and `RuleError` abort the
//! whole run, `LintError` only ever fails the file being linted, and
//! `VellumError` wraps all of them for callers that don't care.

use std::path::PathBuf;

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid configuration
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// A requested style is not present on any search path
    #[error("style '{style}' does not exist on the styles path ({searched})")]
    MissingStyle { style: String, searched: String },

    /// A style directory shadows the built-in style
    #[error("'{0}' collides with the built-in style")]
    BuiltinCollision(String),

    /// The rule filter failed to compile or evaluate
    #[error("Invalid filter '{fragment}': {message}")]
    Filter { fragment: String, message: String },

    /// Blueprint asset is missing or malformed
    #[error("Invalid blueprint '{name}': {message}")]
    Blueprint { name: String, message: String },

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rule-related errors
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Invalid rule definition
    #[error("Invalid rule definition in {name}: {message}")]
    InvalidDefinition { name: String, message: String },

    /// Invalid regex pattern
    #[error("Invalid regex pattern in {name}: {message}")]
    InvalidRegex { name: String, message: String },

    /// A second rule was registered under an existing name
    #[error("the rule '{0}' has already been added")]
    Duplicate(String),
}

/// Errors that fail a single file
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// Content could not be parsed (structured data, grammar output)
    #[error("Parse error in {file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// A tree-sitter grammar or query failed to load
    #[error("Invalid tree-sitter query for {language}: {message}")]
    Query { language: String, message: String },

    /// An external renderer exited unsuccessfully
    #[error("{tool} failed: {message}")]
    Render { tool: String, message: String },

    /// An external renderer is not installed
    #[error("{0} not found on PATH; install it to lint this file type")]
    MissingTool(String),

    /// Extracted text could not be located in its parent content
    #[error("'{needle}' not found in {file}")]
    NotFound { file: PathBuf, needle: String },

    /// Blueprint selector failed against the parsed document
    #[error("Query '{expr}' failed: {message}")]
    Selector { expr: String, message: String },

    /// A rule failed while running
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Configuration error surfaced while linting (blueprints, patterns)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for Vellum
#[derive(Debug, thiserror::Error)]
pub enum VellumError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rule error
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Per-file lint error
    #[error("{0}")]
    Lint(#[from] LintError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

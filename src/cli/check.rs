//! Check command implementation
//!
//! `vellum check` loads the configuration, builds the rule set, lints every
//! discovered file in parallel and prints the alerts. Exit code 1 means at
//! least one error-level alert was reported.

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::cli::common::{
    EXIT_ERROR, EXIT_EXCEEDED, EXIT_PARSE_ERROR, EXIT_SUCCESS, build_rules, discover_files,
    load_config,
};
use crate::engine::{ExecutionEngine, FormatDetector, Linter};
use crate::error::{ConfigError, VellumError};
use crate::output::{HumanFormatter, JsonlFormatter};
use crate::types::Level;
use std::path::Path;
use tracing::debug;

/// Error type specific to check command
#[derive(Debug, thiserror::Error)]
pub(crate) enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Vellum(#[from] VellumError),

    #[error("File walker error: {0}")]
    FileWalker(#[from] crate::engine::file_walker::FileWalkerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    fn exit_code(&self) -> i32 {
        match self {
            CheckError::Config(ConfigError::Parse(_))
            | CheckError::Vellum(VellumError::Config(ConfigError::Parse(_))) => EXIT_PARSE_ERROR,
            _ => EXIT_ERROR,
        }
    }
}

/// Options for one `vellum check` run
#[derive(Debug, Clone)]
pub struct CheckOptions<'a> {
    pub paths: &'a [String],
    pub config: &'a Path,
    pub format: OutputFormat,
    pub color: ColorChoice,
    pub filter: Option<&'a str>,
    pub min_level: Option<Level>,
    pub verbose: bool,
}

/// Run the check command
///
/// Exit code:
/// - 0: no error-level alerts
/// - 1: at least one error-level alert
/// - 2: configuration, rule or I/O error
/// - 3: configuration file is not valid TOML
pub fn run_check(options: &CheckOptions<'_>) -> i32 {
    match run_check_inner(options) {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_EXCEEDED,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Returns whether the run was free of error-level alerts
fn run_check_inner(options: &CheckOptions<'_>) -> Result<bool, CheckError> {
    let mut config = load_config(options.config)?;
    if let Some(level) = options.min_level {
        config.vellum.min_alert_level = level;
    }

    let rules = build_rules(&config, options.filter)?;
    debug!(rules = rules.len(), min_level = %rules.min_level(), "built rule set");

    let linter = Linter::new(config, rules)?;
    let detector = FormatDetector::new(linter.config(), linter.languages())?;
    let files = discover_files(options.paths, linter.config(), &detector, options.verbose)?;
    debug!(files = files.len(), "discovered files");

    let engine = ExecutionEngine::new(linter);
    let result = engine.execute(files);

    match options.format {
        OutputFormat::Human => {
            HumanFormatter::new(options.color.for_stdout()).write_to_stdout(&result)?;
        }
        OutputFormat::Jsonl => {
            print!("{}", JsonlFormatter::new().format(&result));
        }
    }

    Ok(!result.has_errors())
}

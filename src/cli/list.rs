//! List command implementation
//!
//! `vellum list` prints the rule set a check run would use, after styles,
//! overrides and the filter have been applied.

use crate::cli::args::OutputFormat;
use crate::cli::common::{EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS, build_rules, load_config};
use crate::error::{ConfigError, VellumError};
use crate::output::{RuleInfo, RuleListHumanFormatter, RuleListJsonlFormatter};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
enum ListError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Vellum(#[from] VellumError),
}

/// Run the list command
///
/// Exit code 0 on success, 2 on error, 3 when the configuration is not
/// valid TOML.
pub fn run_list(config: &Path, format: OutputFormat, filter: Option<&str>) -> i32 {
    match list_rules(config, filter) {
        Ok(rules) => {
            match format {
                OutputFormat::Human => RuleListHumanFormatter::new().write_to_stdout(&rules),
                OutputFormat::Jsonl => RuleListJsonlFormatter::new().write_to_stdout(&rules),
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                ListError::Config(ConfigError::Parse(_))
                | ListError::Vellum(VellumError::Config(ConfigError::Parse(_))) => {
                    EXIT_PARSE_ERROR
                }
                _ => EXIT_ERROR,
            }
        }
    }
}

fn list_rules(config: &Path, filter: Option<&str>) -> Result<Vec<RuleInfo>, ListError> {
    let config = load_config(config)?;
    let rules = build_rules(&config, filter)?;
    Ok(RuleInfo::collect(&rules))
}

//! Common helper functions shared across CLI commands
//!
//! Loading configuration, building the rule set, and discovering files.

use crate::config::Config;
use crate::engine::file_walker::{FileEntry, FileWalker, FileWalkerError, FormatDetector, WalkResult};
use crate::error::{ConfigError, VellumError};
use crate::rules::{RuleManager, RuleSet};
use std::path::Path;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_EXCEEDED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_PARSE_ERROR: i32 = 3;

/// Load the configuration file
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file does not exist or cannot be read,
/// and `ConfigError::Parse` if it is not valid TOML.
pub(crate) fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }

    Config::load(path)
}

/// Build the active rule set; `filter` replaces `[vellum] filter`
pub(crate) fn build_rules(config: &Config, filter: Option<&str>) -> Result<RuleSet, VellumError> {
    let mut manager = RuleManager::new(config);
    if let Some(filter) = filter {
        manager = manager.with_filter(filter);
    }
    manager.build()
}

/// Walk `paths` and collect every file vellum can lint
///
/// With `verbose`, skipped files are reported on stderr.
pub(crate) fn discover_files(
    paths: &[String],
    config: &Config,
    detector: &FormatDetector,
    verbose: bool,
) -> Result<Vec<FileEntry>, FileWalkerError> {
    let mut all_files = Vec::new();

    for path_str in paths {
        let walker = FileWalker::with_verbose(
            Path::new(path_str),
            &config.vellum.include,
            &config.vellum.exclude,
            detector.clone(),
            verbose,
        )?;

        for result in walker.walk_with_skip_info() {
            match result? {
                WalkResult::File(file) => all_files.push(file),
                WalkResult::Skipped { path, reason } => {
                    eprintln!("Skipped {}: {:?}", path.display(), reason);
                }
            }
        }
    }

    Ok(all_files)
}

#![forbid(unsafe_code)]

//! Parallel execution of the linter across files
//!
//! Files are independent, so the engine fans them out over rayon's pool.
//! A file that fails (unreadable, missing renderer, unparseable data) gets
//! an error result; the remaining files are still linted.

use crate::engine::file_walker::FileEntry;
use crate::engine::linter::Linter;
use crate::error::LintError;
use crate::model::{Alert, File};
use crate::types::Level;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Outcome of linting one file
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: Result<File, LintError>,
}

impl FileResult {
    /// Alerts of a successfully linted file; empty for failures
    pub fn alerts(&self) -> &[Alert] {
        match &self.outcome {
            Ok(file) => &file.alerts,
            Err(_) => &[],
        }
    }
}

/// Result of linting every discovered file
#[derive(Debug)]
pub struct ExecutionResult {
    /// One entry per file, ordered by path
    pub files: Vec<FileResult>,
    /// Number of rules in the active rule set
    pub rules_executed: usize,
}

impl ExecutionResult {
    pub fn files_checked(&self) -> usize {
        self.files.len()
    }

    pub fn alerts(&self) -> impl Iterator<Item = (&PathBuf, &Alert)> {
        self.files
            .iter()
            .flat_map(|f| f.alerts().iter().map(move |a| (&f.path, a)))
    }

    pub fn count(&self, level: Level) -> usize {
        self.alerts().filter(|(_, a)| a.level == level).count()
    }

    /// Files that could not be linted
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &LintError)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            Err(e) => Some((&f.path, e)),
            Ok(_) => None,
        })
    }

    pub fn has_errors(&self) -> bool {
        self.count(Level::Error) > 0
    }
}

/// Lints files in parallel with a shared [`Linter`]
pub struct ExecutionEngine {
    linter: Arc<Linter>,
}

impl ExecutionEngine {
    pub fn new(linter: Linter) -> Self {
        Self {
            linter: Arc::new(linter),
        }
    }

    pub fn linter(&self) -> &Linter {
        &self.linter
    }

    /// Lint every file; results come back sorted by path
    pub fn execute(&self, files: Vec<FileEntry>) -> ExecutionResult {
        let mut results: Vec<FileResult> = files
            .par_iter()
            .map(|entry| {
                let outcome = self.linter.lint_file(&entry.path);
                if let Err(e) = &outcome {
                    warn!(path = %entry.path.display(), error = %e, "failed to lint file");
                }
                FileResult {
                    path: entry.path.clone(),
                    outcome,
                }
            })
            .collect();
        results.sort_by(|a, b| a.path.cmp(&b.path));

        ExecutionResult {
            files: results,
            rules_executed: self.linter.rules().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rules::RuleManager;
    use crate::types::Format;
    use std::fs;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> ExecutionEngine {
        let rule = dir.path().join("styles/Test/Todo.yml");
        fs::create_dir_all(rule.parent().unwrap()).unwrap();
        fs::write(
            &rule,
            "extends: existence\nmessage: \"Resolve '%s'.\"\nlevel: error\ntokens: [TODO]\n",
        )
        .unwrap();
        let mut config = Config::default();
        config.root = dir.path().to_path_buf();
        config.vellum.based_on_styles = vec!["Test".to_string()];
        let rules = RuleManager::new(&config).build().unwrap();
        ExecutionEngine::new(Linter::new(config, rules).unwrap())
    }

    fn entry(dir: &TempDir, name: &str, content: &str) -> FileEntry {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        FileEntry::with_format(path, Format::Plain)
    }

    #[test]
    fn test_execute_empty_files() {
        let dir = TempDir::new().unwrap();
        let result = engine(&dir).execute(vec![]);
        assert_eq!(result.files_checked(), 0);
        assert_eq!(result.rules_executed, 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_parallel_execution_is_ordered() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let files: Vec<FileEntry> = (0..10)
            .rev()
            .map(|i| entry(&dir, &format!("note{i}.txt"), "TODO: write this\n"))
            .collect();

        let result = engine.execute(files);
        assert_eq!(result.files_checked(), 10);
        assert_eq!(result.count(Level::Error), 10);
        let paths: Vec<&PathBuf> = result.files.iter().map(|f| &f.path).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_unreadable_file_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let files = vec![
            entry(&dir, "ok.txt", "TODO\n"),
            FileEntry::with_format(dir.path().join("missing.txt"), Format::Plain),
        ];
        let result = engine.execute(files);
        assert_eq!(result.failures().count(), 1);
        assert_eq!(result.count(Level::Error), 1);
        assert!(result.has_errors());
    }
}

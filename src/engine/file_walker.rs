//! File discovery and traversal with gitignore support
//!
//! This module provides gitignore-aware file walking with glob-based
//! filtering. Only files vellum knows how to lint are yielded: markup and
//! plain text always, source code when a grammar or comment syntax exists,
//! and structured data only when a blueprint is registered for it.

use crate::code::{LanguageRegistry, legacy};
use crate::config::Config;
use crate::types::{Format, GlobPattern, normalize_ext};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during file walking
#[derive(Debug, Error)]
pub enum FileWalkerError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decides how (and whether) a path can be linted
#[derive(Clone)]
pub struct FormatDetector {
    aliases: Arc<HashMap<String, String>>,
    grammars: Arc<HashSet<String>>,
    blueprints: Option<GlobSet>,
    delimiters: Option<GlobSet>,
}

impl FormatDetector {
    pub fn new(config: &Config, languages: &LanguageRegistry) -> Result<Self, FileWalkerError> {
        let globs = |patterns: Vec<GlobPattern>| -> Result<Option<GlobSet>, FileWalkerError> {
            if patterns.is_empty() {
                Ok(None)
            } else {
                build_globset(&patterns).map(Some)
            }
        };
        Ok(Self {
            aliases: Arc::new(config.formats.clone()),
            grammars: Arc::new(languages.extensions().map(str::to_string).collect()),
            blueprints: globs(config.blueprints.keys().map(GlobPattern::new).collect())?,
            delimiters: globs(
                config
                    .comment_delimiters
                    .keys()
                    .map(GlobPattern::new)
                    .collect(),
            )?,
        })
    }

    /// The format a file would be linted as, or `None` to skip it
    pub fn detect(&self, path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?;
        let normed = normalize_ext(ext, &self.aliases);
        let format = Format::from_ext(&normed);
        let matches = |set: &Option<GlobSet>| set.as_ref().is_some_and(|s| s.is_match(path));

        if matches(&self.blueprints) {
            return Some(format);
        }
        match format {
            Format::Data => None,
            Format::Code => {
                let known = self.grammars.contains(&normed)
                    || legacy::syntax_for(&normed).is_some()
                    || matches(&self.delimiters);
                known.then_some(Format::Code)
            }
            other => Some(other),
        }
    }
}

impl std::fmt::Debug for FormatDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatDetector")
            .field("grammars", &self.grammars)
            .finish()
    }
}

/// Reason why a file was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File did not match include patterns, or matched an exclude
    ExcludedByPattern,
    /// Nothing knows how to lint this kind of file
    UnsupportedFormat,
    /// File is not a regular file (e.g., directory, symlink)
    NotAFile,
}

/// Result of file walking - either a file to lint or a skipped file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkResult {
    File(FileEntry),
    Skipped { path: PathBuf, reason: SkipReason },
}

/// A discovered file and the format it will be linted as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub format: Format,
}

impl FileEntry {
    /// Creates a FileEntry if the detector accepts the path
    pub fn new(path: PathBuf, detector: &FormatDetector) -> Option<Self> {
        let format = detector.detect(&path)?;
        Some(Self { path, format })
    }

    pub fn with_format(path: PathBuf, format: Format) -> Self {
        Self { path, format }
    }
}

fn build_globset(patterns: &[GlobPattern]) -> Result<GlobSet, FileWalkerError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.as_str()).map_err(|e| FileWalkerError::InvalidGlob {
            pattern: pattern.as_str().to_string(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| FileWalkerError::InvalidGlob {
        pattern: "<globset>".to_string(),
        source: e,
    })
}

/// Iterator over lintable files
pub struct FileWalker {
    walker: ignore::Walk,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    verbose: bool,
    detector: FormatDetector,
}

impl FileWalker {
    /// Creates a new FileWalker
    ///
    /// `include` empty means include everything; `exclude` is applied after
    /// `include`. `.git` directories are always excluded.
    pub fn new(
        root: &Path,
        include: &[GlobPattern],
        exclude: &[GlobPattern],
        detector: FormatDetector,
    ) -> Result<Self, FileWalkerError> {
        Self::with_verbose(root, include, exclude, detector, false)
    }

    /// Like [`new`](Self::new); with `verbose` skipped files are reported
    pub fn with_verbose(
        root: &Path,
        include: &[GlobPattern],
        exclude: &[GlobPattern],
        detector: FormatDetector,
        verbose: bool,
    ) -> Result<Self, FileWalkerError> {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .build();

        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_globset(include)?)
        };

        let mut exclude_patterns = Vec::from(exclude);
        exclude_patterns.push(GlobPattern::new("**/.git/**"));
        let exclude_set = Some(build_globset(&exclude_patterns)?);

        Ok(Self {
            walker,
            include_set,
            exclude_set,
            verbose,
            detector,
        })
    }

    /// Walks the directory tree and returns an iterator over lintable files
    pub fn walk(self) -> impl Iterator<Item = Result<FileEntry, FileWalkerError>> {
        self.walk_with_skip_info()
            .filter_map(|result| match result {
                Ok(WalkResult::File(file)) => Some(Ok(file)),
                Ok(WalkResult::Skipped { .. }) => None,
                Err(e) => Some(Err(e)),
            })
    }

    /// Walks the directory tree and returns an iterator with skip information
    pub fn walk_with_skip_info(self) -> impl Iterator<Item = Result<WalkResult, FileWalkerError>> {
        let include_set = self.include_set;
        let exclude_set = self.exclude_set;
        let verbose = self.verbose;
        let detector = self.detector;

        let skipped = move |path: &Path, reason: SkipReason| {
            verbose.then(|| {
                Ok::<_, FileWalkerError>(WalkResult::Skipped {
                    path: path.to_path_buf(),
                    reason,
                })
            })
        };

        self.walker.filter_map(move |result| {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => return Some(Err(FileWalkerError::Walk(e))),
            };
            let path = entry.path();

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                return skipped(path, SkipReason::NotAFile);
            }

            if let Some(ref include_set) = include_set
                && !include_set.is_match(path)
            {
                return skipped(path, SkipReason::ExcludedByPattern);
            }

            if let Some(ref exclude_set) = exclude_set
                && exclude_set.is_match(path)
            {
                return skipped(path, SkipReason::ExcludedByPattern);
            }

            match FileEntry::new(path.to_path_buf(), &detector) {
                Some(file) => Some(Ok(WalkResult::File(file))),
                None => skipped(path, SkipReason::UnsupportedFormat),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn detector(extra: &str) -> FormatDetector {
        let config = Config::parse(&format!("[vellum]\nversion = \"1\"\n{extra}")).unwrap();
        FormatDetector::new(&config, &LanguageRegistry::empty()).unwrap()
    }

    #[test]
    fn test_detect_markup_and_plain() {
        let detector = detector("");
        assert_eq!(detector.detect(Path::new("README.md")), Some(Format::Markdown));
        assert_eq!(detector.detect(Path::new("guide.markdown")), Some(Format::Markdown));
        assert_eq!(detector.detect(Path::new("index.html")), Some(Format::Html));
        assert_eq!(detector.detect(Path::new("notes.txt")), Some(Format::Plain));
        assert_eq!(detector.detect(Path::new("Makefile")), None);
    }

    #[test]
    fn test_detect_code_needs_a_comment_syntax() {
        let detector = detector("");
        assert_eq!(detector.detect(Path::new("main.c")), Some(Format::Code));
        assert_eq!(detector.detect(Path::new("image.png")), None);
    }

    #[test]
    fn test_detect_data_needs_a_blueprint() {
        assert_eq!(detector("").detect(Path::new("api.json")), None);
        let detector = detector("[blueprints]\n\"*.json\" = \"OpenAPI\"\n");
        assert_eq!(detector.detect(Path::new("api.json")), Some(Format::Data));
    }

    #[test]
    fn test_detect_honors_aliases_and_delimiters() {
        let detector = detector(
            "[formats]\nmdx = \"md\"\n[comment_delimiters]\n\"*.tpl\" = [\"{{!\", \"}}\"]\n",
        );
        assert_eq!(detector.detect(Path::new("page.mdx")), Some(Format::Markdown));
        assert_eq!(detector.detect(Path::new("page.tpl")), Some(Format::Code));
    }

    #[test]
    fn test_build_globset_invalid() {
        assert!(build_globset(&[GlobPattern::new("[invalid")]).is_err());
        assert!(build_globset(&[GlobPattern::new("src/**/*.md")]).is_ok());
    }

    #[test]
    fn test_walk_basic() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("doc.md"), "# Hi").unwrap();
        fs::write(temp_dir.path().join("data.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("blob.bin"), "x").unwrap();

        let walker = FileWalker::new(temp_dir.path(), &[], &[], detector("")).unwrap();
        let files: Vec<_> = walker.walk().collect::<Result<_, _>>().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].format, Format::Markdown);
    }

    #[test]
    fn test_walk_with_include_filter_and_skip_info() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        fs::write(temp_dir.path().join("docs/a.md"), "a").unwrap();
        fs::write(temp_dir.path().join("b.md"), "b").unwrap();

        let include = vec![GlobPattern::new("**/docs/**")];
        let walker =
            FileWalker::with_verbose(temp_dir.path(), &include, &[], detector(""), true).unwrap();
        let results: Vec<WalkResult> = walker.walk_with_skip_info().filter_map(Result::ok).collect();

        let linted: Vec<&FileEntry> = results
            .iter()
            .filter_map(|r| match r {
                WalkResult::File(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(linted.len(), 1);
        assert!(linted[0].path.ends_with("docs/a.md"));
        assert!(results.iter().any(|r| matches!(
            r,
            WalkResult::Skipped { reason: SkipReason::ExcludedByPattern, .. }
        )));
    }
}

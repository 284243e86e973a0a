#![forbid(unsafe_code)]

//! Files, blocks and alerts
//!
//! A [`File`] is what the pipeline lints. Extraction turns it into
//! [`Block`]s, rules turn blocks into [`Alert`]s, and the position remapper
//! moves those alerts back into the file's coordinate space.

use crate::types::{Level, normalize_ext};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A single rule finding
///
/// `line` is 1-based. `span` holds 1-based, inclusive character columns
/// within that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub check: String,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
    pub line: usize,
    pub span: (usize, usize),
    #[serde(rename = "match")]
    pub matched: String,
}

impl Alert {
    pub fn new(check: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Alert {
            check: check.into(),
            level,
            message: message.into(),
            description: String::new(),
            link: String::new(),
            line: 1,
            span: (1, 1),
            matched: String::new(),
        }
    }

    /// Place the alert on the byte range `range` of `text`
    pub fn located(mut self, text: &str, range: Range<usize>) -> Self {
        let (line, span) = locate(text, range.clone());
        self.line = line;
        self.span = span;
        self.matched = text[range].to_string();
        self
    }
}

/// Line and character span of a byte range inside `text`
///
/// The span end is derived from the matched text's length, so a match that
/// runs across a newline still reports a single-line span.
pub fn locate(text: &str, range: Range<usize>) -> (usize, (usize, usize)) {
    let before = &text[..range.start];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let start = text[line_start..range.start].chars().count() + 1;
    let width = text[range].chars().count();
    (line, (start, start + width.saturating_sub(1)))
}

/// A contiguous span of prose plus its anchor in the parent content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The text rules see
    pub text: String,
    /// Raw text before delimiters or markup were stripped
    pub source: String,
    /// Dotted scope such as `text.comment.line.rs`
    pub scope: String,
    /// 1-based line in the parent content where the block begins
    pub line: usize,
    /// 0-based character column of the block's first line
    pub column: usize,
}

impl Block {
    pub fn new(text: impl Into<String>, scope: impl Into<String>) -> Self {
        let text = text.into();
        Block {
            source: text.clone(),
            text,
            scope: scope.into(),
            line: 1,
            column: 0,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}

/// A file being linted
///
/// `content` is the live text: during a sub-lint it holds the extracted
/// block rather than the whole file. `original` never changes.
#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub original: String,
    content: String,
    pub real_ext: String,
    pub normed_ext: String,
    pub alerts: Vec<Alert>,
}

impl File {
    pub fn new(
        path: impl AsRef<Path>,
        content: impl Into<String>,
        aliases: &HashMap<String, String>,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        let real_ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "txt".to_string());
        let normed_ext = normalize_ext(&real_ext, aliases);
        let content = content.into();
        File {
            path,
            original: content.clone(),
            content,
            real_ext,
            normed_ext,
            alerts: Vec::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Run `f` with `text` standing in for the file's content
    ///
    /// The previous content is restored whether or not `f` succeeds.
    pub fn sub_lint<T, E>(
        &mut self,
        text: &str,
        f: impl FnOnce(&mut File) -> Result<T, E>,
    ) -> Result<T, E> {
        let whole = std::mem::replace(&mut self.content, text.to_string());
        let result = f(self);
        self.content = whole;
        result
    }

    /// Sort alerts by line, then column; ties keep insertion order
    pub fn sort_alerts(&mut self) {
        self.alerts.sort_by_key(|a| (a.line, a.span.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_multiline() {
        let text = "first line\nsecond wörd here";
        let start = text.find("here").unwrap();
        let (line, span) = locate(text, start..start + 4);
        assert_eq!(line, 2);
        assert_eq!(span, (13, 16));
    }

    #[test]
    fn test_sub_lint_restores_content_on_error() {
        let mut file = File::new("doc.md", "whole file", &HashMap::new());
        let result: Result<(), String> = file.sub_lint("block", |f| {
            assert_eq!(f.content(), "block");
            Err("boom".to_string())
        });
        assert!(result.is_err());
        assert_eq!(file.content(), "whole file");
    }

    #[test]
    fn test_sort_alerts_is_stable() {
        let mut file = File::new("a.txt", "", &HashMap::new());
        let mut a = Alert::new("A.One", Level::Warning, "one");
        a.line = 2;
        let mut b = Alert::new("B.Two", Level::Error, "two");
        b.line = 1;
        b.span = (5, 6);
        let mut c = Alert::new("C.Three", Level::Error, "three");
        c.line = 1;
        c.span = (5, 9);
        file.alerts = vec![a, b, c];
        file.sort_alerts();
        let order: Vec<&str> = file.alerts.iter().map(|a| a.check.as_str()).collect();
        assert_eq!(order, vec!["B.Two", "C.Three", "A.One"]);
    }

    #[test]
    fn test_file_extensions() {
        let file = File::new("docs/guide.markdown", "", &HashMap::new());
        assert_eq!(file.real_ext, "markdown");
        assert_eq!(file.normed_ext, "md");
    }
}

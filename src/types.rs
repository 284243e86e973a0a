#![forbid(unsafe_code)]

//! Core domain types for Vellum
//!
//! Alert levels, scope selectors, glob patterns and the format an extension
//! maps to. Everything here is a plain value type shared by the rest of the
//! crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Alert levels, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Suggestion,
    #[default]
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Suggestion => "suggestion",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suggestion" => Ok(Level::Suggestion),
            "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            other => Err(format!("unknown alert level '{other}'")),
        }
    }
}

/// A single scope selector such as `comment.line` or `~heading`
///
/// A selector matches a block scope when every one of its dotted sections
/// appears in the block's scope. A leading `~` negates the selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Selector {
    raw: String,
    negated: bool,
    sections: Vec<String>,
}

impl Selector {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (negated, body) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };
        let sections = body
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Selector {
            negated,
            sections,
            raw,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// The leading section (`sentence` for `sentence.md`)
    pub fn base(&self) -> &str {
        self.sections.first().map(String::as_str).unwrap_or("")
    }

    /// True when every section of this selector is present in `scope`,
    /// ignoring negation.
    pub fn contains(&self, scope: &str) -> bool {
        let parts: Vec<&str> = scope.split('.').collect();
        self.sections.iter().all(|s| parts.contains(&s.as_str()))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Selector::new(value)
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::new(value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.raw
    }
}

/// The scopes a rule applies to
///
/// Positive selectors are alternatives; negated selectors all have to pass.
/// A set with only negated selectors matches everything they don't exclude.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeSet(Vec<Selector>);

impl ScopeSet {
    pub fn new(selectors: Vec<Selector>) -> Self {
        ScopeSet(selectors)
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, scope: &str) -> bool {
        let mut positive = false;
        let mut any_positive = false;
        for selector in &self.0 {
            if selector.is_negated() {
                if selector.contains(scope) {
                    return false;
                }
            } else {
                positive = true;
                any_positive |= selector.contains(scope);
            }
        }
        !positive || any_positive
    }
}

/// A glob pattern for file matching
///
/// This is a simple wrapper around a string that will be used with the `globset` crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobPattern(String);

impl GlobPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        GlobPattern(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GlobPattern {
    fn from(pattern: String) -> Self {
        GlobPattern(pattern)
    }
}

impl From<&str> for GlobPattern {
    fn from(pattern: &str) -> Self {
        GlobPattern(pattern.to_string())
    }
}

/// How a file (or an extracted value) is turned into blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Markdown,
    Mdx,
    AsciiDoc,
    Rst,
    Html,
    Org,
    Plain,
    Code,
    Data,
}

impl Format {
    /// Format for a normalized extension (no leading dot)
    pub fn from_ext(ext: &str) -> Format {
        match ext {
            "md" => Format::Markdown,
            "mdx" => Format::Mdx,
            "adoc" => Format::AsciiDoc,
            "rst" => Format::Rst,
            "html" => Format::Html,
            "org" => Format::Org,
            "txt" => Format::Plain,
            "json" | "yml" | "toml" => Format::Data,
            _ => Format::Code,
        }
    }

    /// Format for a blueprint step's `type`, defaulting to plain text
    pub fn from_step_type(kind: &str) -> Format {
        match kind.trim_start_matches('.') {
            "md" | "markdown" => Format::Markdown,
            "rst" => Format::Rst,
            "html" => Format::Html,
            "org" => Format::Org,
            "adoc" | "asciidoc" | "xml" => Format::AsciiDoc,
            _ => Format::Plain,
        }
    }
}

/// Normalize a real extension (`"markdown"`) to its canonical form (`"md"`)
///
/// User-configured aliases win over the built-in groups.
pub fn normalize_ext(real_ext: &str, aliases: &HashMap<String, String>) -> String {
    let ext = real_ext.trim_start_matches('.').to_ascii_lowercase();
    if let Some(alias) = aliases.get(&ext) {
        return alias.trim_start_matches('.').to_string();
    }
    let canonical = match ext.as_str() {
        "md" | "mdown" | "markdown" | "markdn" | "mkd" => "md",
        "html" | "htm" | "shtml" | "xhtml" => "html",
        "rst" | "rest" => "rst",
        "adoc" | "asciidoc" | "asc" => "adoc",
        "txt" | "text" => "txt",
        "yml" | "yaml" => "yml",
        "jsx" | "mjs" | "cjs" => "js",
        "mts" | "cts" => "ts",
        "pyi" => "py",
        "h" => "c",
        "hpp" | "cc" | "cxx" | "hh" => "cpp",
        other => other,
    };
    canonical.to_string()
}

#![forbid(unsafe_code)]

//! Language adapters for comment extraction
//!
//! Each adapter bundles everything needed to pull comments out of one
//! language: the grammar, the queries that capture comments, the delimiter
//! pattern stripped from captured text, the prefix trimmed from interior
//! lines of block comments, and a padding function giving the width of the
//! opening delimiter. Adapters are immutable and shared across files.

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// One tree-sitter query and the meta scope its captures get
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Inserted into the scope: `text.comment.<name>.line`
    pub name: String,
    pub expr: String,
}

impl QuerySpec {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        QuerySpec {
            name: name.into(),
            expr: expr.into(),
        }
    }
}

/// Everything needed to extract comments from one language
pub struct LanguageAdapter {
    pub name: &'static str,
    pub delims: Regex,
    pub grammar: tree_sitter::Language,
    pub queries: Vec<QuerySpec>,
    pub cutset: &'static str,
    pub padding: fn(&str) -> usize,
}

impl std::fmt::Debug for LanguageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageAdapter")
            .field("name", &self.name)
            .field("delims", &self.delims.as_str())
            .field("queries", &self.queries.len())
            .field("cutset", &self.cutset)
            .finish()
    }
}

/// Width of the longest delimiter `s` starts with, plus following spaces
pub fn compute_padding(s: &str, delims: &[&str]) -> usize {
    let trimmed = s.trim_start();
    let lead = s.chars().count() - trimmed.chars().count();
    let Some(delim) = delims
        .iter()
        .filter(|d| trimmed.starts_with(**d))
        .max_by_key(|d| d.len())
    else {
        return lead;
    };
    let after = &trimmed[delim.len()..];
    let spaces = after.chars().take_while(|c| *c == ' ').count();
    lead + delim.chars().count() + spaces
}

fn c_style(s: &str) -> usize {
    compute_padding(s, &["//", "/*", "/**"])
}

#[cfg(feature = "lang-rust")]
fn rust() -> Option<LanguageAdapter> {
    Some(LanguageAdapter {
        name: "rust",
        delims: Regex::new(r"/{2,3}!?").ok()?,
        grammar: tree_sitter_rust::language(),
        queries: vec![QuerySpec::new("", "(line_comment)+ @comment")],
        cutset: " ",
        padding: |s| compute_padding(s, &["//", "//!", "///"]),
    })
}

#[cfg(feature = "lang-python")]
fn python() -> Option<LanguageAdapter> {
    Some(LanguageAdapter {
        name: "python",
        delims: Regex::new(r#"#|"""|'''"#).ok()?,
        grammar: tree_sitter_python::language(),
        queries: vec![
            QuerySpec::new("", "(comment)+ @comment"),
            QuerySpec::new(
                "",
                "(function_definition body: (block . (expression_statement (string) @docstring)))",
            ),
            QuerySpec::new(
                "",
                "(class_definition body: (block . (expression_statement (string) @docstring)))",
            ),
            QuerySpec::new("", "(module . (expression_statement (string) @docstring))"),
        ],
        cutset: " ",
        padding: |s| compute_padding(s, &["#", "\"\"\"", "'''"]),
    })
}

#[cfg(feature = "lang-go")]
fn go() -> Option<LanguageAdapter> {
    Some(LanguageAdapter {
        name: "go",
        delims: Regex::new(r"//|/\*|\*/").ok()?,
        grammar: tree_sitter_go::language(),
        queries: vec![QuerySpec::new("", "(comment) @comment")],
        cutset: " *",
        padding: c_style,
    })
}

#[cfg(feature = "lang-javascript")]
fn javascript() -> Option<LanguageAdapter> {
    Some(LanguageAdapter {
        name: "javascript",
        delims: Regex::new(r"//|/\*\*?|\*/").ok()?,
        grammar: tree_sitter_javascript::language(),
        queries: vec![QuerySpec::new("", "(comment) @comment")],
        cutset: " *",
        padding: c_style,
    })
}

#[cfg(feature = "lang-typescript")]
fn typescript(tsx: bool) -> Option<LanguageAdapter> {
    Some(LanguageAdapter {
        name: if tsx { "tsx" } else { "typescript" },
        delims: Regex::new(r"//|/\*\*?|\*/").ok()?,
        grammar: if tsx {
            tree_sitter_typescript::language_tsx()
        } else {
            tree_sitter_typescript::language_typescript()
        },
        queries: vec![QuerySpec::new("", "(comment) @comment")],
        cutset: " *",
        padding: c_style,
    })
}

/// Extension to adapter lookup
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    adapters: HashMap<String, Arc<LanguageAdapter>>,
}

impl LanguageRegistry {
    /// An empty registry; every code file falls back to the legacy lexer
    pub fn empty() -> Self {
        LanguageRegistry::default()
    }

    /// Registry with every grammar compiled into this build
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut registry = LanguageRegistry::empty();

        #[cfg(feature = "lang-rust")]
        registry.register(&["rs"], rust());
        #[cfg(feature = "lang-python")]
        registry.register(&["py"], python());
        #[cfg(feature = "lang-go")]
        registry.register(&["go"], go());
        #[cfg(feature = "lang-javascript")]
        registry.register(&["js"], javascript());
        #[cfg(feature = "lang-typescript")]
        {
            registry.register(&["ts"], typescript(false));
            registry.register(&["tsx"], typescript(true));
        }

        registry
    }

    /// Register `adapter` under each extension
    pub fn register(&mut self, exts: &[&str], adapter: Option<LanguageAdapter>) {
        let Some(adapter) = adapter else {
            return;
        };
        let adapter = Arc::new(adapter);
        for ext in exts {
            self.adapters.insert(ext.to_string(), Arc::clone(&adapter));
        }
    }

    /// Adapter for a normalized extension
    pub fn get(&self, ext: &str) -> Option<Arc<LanguageAdapter>> {
        self.adapters.get(ext.trim_start_matches('.')).cloned()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_padding() {
        assert_eq!(compute_padding("// hello", &["//"]), 3);
        assert_eq!(compute_padding("    /// docs", &["//", "///"]), 8);
        assert_eq!(compute_padding("#no space", &["#"]), 1);
        assert_eq!(compute_padding("plain", &["#"]), 0);
        assert_eq!(c_style("/** Doc */"), 4);
    }

    #[test]
    fn test_empty_registry() {
        let registry = LanguageRegistry::empty();
        assert!(registry.get("rs").is_none());
        assert_eq!(registry.extensions().count(), 0);
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn test_rust_adapter_registered() {
        let registry = LanguageRegistry::new();
        let adapter = registry.get(".rs").unwrap();
        assert_eq!(adapter.name, "rust");
        assert_eq!(adapter.delims.replace_all("/// Docs", ""), " Docs");
        assert_eq!((adapter.padding)("//! Crate docs"), 4);
    }

    #[cfg(feature = "lang-typescript")]
    #[test]
    fn test_tsx_has_its_own_grammar() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.get("tsx").unwrap().name, "tsx");
        assert_eq!(registry.get("ts").unwrap().name, "typescript");
    }
}

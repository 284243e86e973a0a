//! Comment extraction from source code
//!
//! Files with a compiled grammar are parsed with tree-sitter; everything
//! else goes through the regex line scanner in [`legacy`].

pub mod comments;
pub mod language;
pub mod legacy;

pub use comments::{Comment, coalesce, extract_comments};
pub use language::{LanguageAdapter, LanguageRegistry, QuerySpec};

use crate::error::LintError;
use tracing::debug;

/// The comments of one file and how their delimiters are measured
#[derive(Debug, Clone)]
pub struct Extraction {
    pub comments: Vec<Comment>,
    /// Width of the delimiter and indentation before the text on a raw
    /// comment line; only grammar-backed languages provide one
    pub padding: Option<fn(&str) -> usize>,
}

impl Extraction {
    fn scanned(comments: Vec<Comment>) -> Self {
        Extraction {
            comments,
            padding: None,
        }
    }
}

/// Comments in `source`, or `None` when nothing knows how to read `ext`
///
/// `queries` replaces the adapter's own queries (from a tree-sitter
/// blueprint); `delimiters` is a configured block-comment pair used when no
/// grammar or built-in syntax exists.
pub fn comments_for(
    source: &str,
    ext: &str,
    registry: &LanguageRegistry,
    queries: Option<&[QuerySpec]>,
    delimiters: Option<(&str, &str)>,
) -> Result<Option<Extraction>, LintError> {
    if let Some(adapter) = registry.get(ext) {
        debug!(language = adapter.name, "extracting comments with tree-sitter");
        let comments = extract_comments(source, &adapter, queries)?;
        return Ok(Some(Extraction {
            comments,
            padding: Some(adapter.padding),
        }));
    }

    if let Some(syntax) = legacy::syntax_for(ext) {
        debug!(ext, "extracting comments with the line scanner");
        return Ok(Some(Extraction::scanned(legacy::scan(source, syntax))));
    }

    Ok(delimiters
        .and_then(|(start, end)| legacy::custom_syntax(start, end))
        .map(|syntax| Extraction::scanned(legacy::scan(source, &syntax))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_line_scanner() {
        let registry = LanguageRegistry::empty();
        let extraction = comments_for("x = 1 # note\n", "rb", &registry, None, None)
            .unwrap()
            .unwrap();
        assert_eq!(extraction.comments[0].text, "note");
        assert!(extraction.padding.is_none());
    }

    #[test]
    fn test_unknown_language_without_delimiters() {
        let registry = LanguageRegistry::empty();
        assert!(comments_for("text", "zzz", &registry, None, None).unwrap().is_none());
        let found = comments_for("a <# b #>", "zzz", &registry, None, Some(("<#", "#>")))
            .unwrap()
            .unwrap();
        assert_eq!(found.comments[0].text, "b");
    }
}

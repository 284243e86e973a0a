#![forbid(unsafe_code)]

//! Comment extraction over tree-sitter parse trees

use super::language::{LanguageAdapter, QuerySpec};
use crate::error::LintError;
use std::collections::HashSet;
use tree_sitter::{Node, Parser, Query, QueryCursor};

/// A comment pulled out of source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment text with delimiters removed
    pub text: String,
    /// Raw captured source
    pub source: String,
    /// 1-based line the comment starts on
    pub line: usize,
    /// 0-based character column the comment starts at
    pub offset: usize,
    /// `text.comment[.meta].line` or `text.comment[.meta].block`
    pub scope: String,
}

impl Comment {
    pub fn is_block(&self) -> bool {
        self.scope.ends_with(".block")
    }

    fn end_line(&self) -> usize {
        self.line + self.text.matches('\n').count()
    }
}

fn char_column(source: &str, node: &Node) -> usize {
    let start = node.start_byte();
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..start].chars().count()
}

fn to_comment(source: &str, node: &Node, meta: &str, adapter: &LanguageAdapter) -> Comment {
    let raw = &source[node.byte_range()];
    let stripped = adapter.delims.replace_all(raw, "");

    let meta = if meta.is_empty() {
        String::new()
    } else {
        format!(".{meta}")
    };

    let (text, captured, kind) = if stripped.matches('\n').count() > 1 {
        let trimmed: Vec<&str> = stripped
            .split('\n')
            .map(|line| line.trim_start_matches(|c| adapter.cutset.contains(c)))
            .collect();
        (trimmed.join("\n"), raw, "block")
    } else {
        (
            stripped.trim_end_matches(['\r', '\n']).to_string(),
            raw.trim_end_matches(['\r', '\n']),
            "line",
        )
    };

    Comment {
        text,
        source: captured.to_string(),
        line: node.start_position().row + 1,
        offset: char_column(source, node),
        scope: format!("text.comment{meta}.{kind}"),
    }
}

/// Run `queries` (or the adapter's own) over `source` and coalesce the result
pub fn extract_comments(
    source: &str,
    adapter: &LanguageAdapter,
    queries: Option<&[QuerySpec]>,
) -> Result<Vec<Comment>, LintError> {
    let queries = queries.unwrap_or(&adapter.queries);

    let mut parser = Parser::new();
    parser
        .set_language(&adapter.grammar)
        .map_err(|e| LintError::Query {
            language: adapter.name.to_string(),
            message: e.to_string(),
        })?;
    let tree = parser.parse(source, None).ok_or_else(|| LintError::Query {
        language: adapter.name.to_string(),
        message: "parser produced no tree".to_string(),
    })?;

    let mut comments = Vec::new();
    for spec in queries {
        let query = Query::new(&adapter.grammar, &spec.expr).map_err(|e| LintError::Query {
            language: adapter.name.to_string(),
            message: e.to_string(),
        })?;

        // quantified patterns can report the same node in several matches
        let mut seen = HashSet::new();
        let mut cursor = QueryCursor::new();
        for m in cursor.matches(&query, tree.root_node(), source.as_bytes()) {
            for capture in m.captures {
                if seen.insert(capture.node.start_byte()) {
                    comments.push(to_comment(source, &capture.node, &spec.name, adapter));
                }
            }
        }
    }

    if queries.len() > 1 {
        comments.sort_by_key(|c| c.line);
    }

    Ok(coalesce(comments))
}

/// Merge line comments on consecutive lines that start at the same column
///
/// Merged text is joined with a single newline so every line of the result
/// still corresponds to one source line. Block comments are never merged.
pub fn coalesce(comments: Vec<Comment>) -> Vec<Comment> {
    let mut joined: Vec<Comment> = Vec::with_capacity(comments.len());
    let mut previous: Option<(usize, usize, bool)> = None;

    for comment in comments {
        let line_scoped = !comment.is_block();
        let continues = match (previous, joined.last()) {
            (Some((end, offset, true)), Some(last)) => {
                line_scoped && !last.is_block() && end + 1 == comment.line && offset == comment.offset
            }
            _ => false,
        };
        previous = Some((comment.end_line(), comment.offset, line_scoped));

        match joined.last_mut() {
            Some(last) if continues => {
                last.text.push('\n');
                last.text.push_str(comment.text.trim_start_matches(' '));
                last.source.push('\n');
                last.source.push_str(&comment.source);
            }
            _ => joined.push(comment),
        }
    }

    for comment in &mut joined {
        let trimmed = comment.text.trim_start_matches(' ');
        if trimmed.len() != comment.text.len() {
            comment.text = trimmed.to_string();
        }
    }
    joined
}

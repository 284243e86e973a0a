//! Regex line scanner for languages without a compiled grammar
//!
//! Each line is tested against an inline pattern, then a block-start
//! pattern; once inside a block, lines accumulate until the block-end
//! pattern matches. Output uses the same [`Comment`] shape as the
//! tree-sitter extractor.

use super::comments::Comment;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug)]
pub struct CommentSyntax {
    pub inline: Regex,
    pub block_start: Option<Regex>,
    pub block_end: Option<Regex>,
    pub delims: Regex,
}

fn syntax(inline: &str, block: Option<(&str, &str)>, delims: &str) -> Option<CommentSyntax> {
    let (block_start, block_end) = match block {
        Some((start, end)) => (Some(Regex::new(start).ok()?), Some(Regex::new(end).ok()?)),
        None => (None, None),
    };
    Some(CommentSyntax {
        inline: Regex::new(inline).ok()?,
        block_start,
        block_end,
        delims: Regex::new(delims).ok()?,
    })
}

static SYNTAXES: LazyLock<HashMap<&'static str, CommentSyntax>> = LazyLock::new(|| {
    let c_like = || {
        syntax(
            r"(?:^|\s)(//.+)|(/\*.+\*/)",
            Some((r"/\*", r"\*/")),
            r"/{2,3}!?|/\*\*?|\*/",
        )
    };
    let hash = || syntax(r"(?:^|\s)(#.+)", None, r"#+");
    let dash = || syntax(r"(?:^|\s)(--.+)", None, r"--");

    let mut table = HashMap::new();
    for ext in [
        "c", "cpp", "cs", "java", "js", "ts", "tsx", "go", "rs", "swift", "kt", "scala", "php",
        "dart", "proto",
    ] {
        if let Some(s) = c_like() {
            table.insert(ext, s);
        }
    }
    for ext in ["sh", "bash", "pl", "r", "jl", "ps1", "coffee", "ex", "nim", "cmake"] {
        if let Some(s) = hash() {
            table.insert(ext, s);
        }
    }
    for ext in ["sql", "hs", "ada"] {
        if let Some(s) = dash() {
            table.insert(ext, s);
        }
    }
    if let Some(s) = syntax(r"(?:^|\s)(#.+)", Some((r#"^\s*(?:"""|''')"#, r#"(?:"""|''')"#)), r#"#+|"""|'''"#) {
        table.insert("py", s);
    }
    if let Some(s) = syntax(r"(?:^|\s)(#.+)", Some((r"^=begin", r"^=end")), r"#+|^=begin|^=end") {
        table.insert("rb", s);
    }
    if let Some(s) = syntax(r"(?:^|\s)(--[^\[].*)", Some((r"--\[\[", r"\]\]")), r"--(?:\[\[)?|\]\]") {
        table.insert("lua", s);
    }
    for ext in ["css", "less", "scss"] {
        if let Some(s) = syntax(r"(/\*.+\*/)", Some((r"/\*", r"\*/")), r"/\*|\*/") {
            table.insert(ext, s);
        }
    }
    table
});

/// The built-in syntax for a normalized extension, if any
pub fn syntax_for(ext: &str) -> Option<&'static CommentSyntax> {
    SYNTAXES.get(ext.trim_start_matches('.'))
}

/// Build a syntax from a configured pair of block delimiters
pub fn custom_syntax(start: &str, end: &str) -> Option<CommentSyntax> {
    let (s, e) = (regex::escape(start), regex::escape(end));
    syntax(
        &format!("({s}.+{e})"),
        Some((&s, &e)),
        &format!("{s}|{e}"),
    )
}

fn comment(syntax: &CommentSyntax, raw: &str, line: usize, offset: usize, kind: &str) -> Comment {
    let stripped = syntax.delims.replace_all(raw, "");
    let text = stripped.trim_start_matches(' ');
    Comment {
        text: if kind == "line" { text.trim_end() } else { text }.to_string(),
        source: raw.to_string(),
        line,
        offset,
        scope: format!("text.comment.{kind}"),
    }
}

/// Scan `source` line by line and return every comment found
pub fn scan(source: &str, syntax: &CommentSyntax) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut block: Option<(usize, usize, Vec<&str>)> = None;
    let mut skip_block = false;

    for (idx, line) in source.lines().enumerate() {
        if let Some((start, offset, lines)) = block.as_mut() {
            match syntax.block_end.as_ref().and_then(|re| re.find(line)) {
                Some(end) => {
                    lines.push(&line[..end.end()]);
                    let raw = lines.join("\n");
                    let mut found = comment(syntax, &raw, *start, *offset, "block");
                    found.text = found
                        .text
                        .split('\n')
                        .map(|l| l.trim_start_matches([' ', '*']))
                        .collect::<Vec<_>>()
                        .join("\n");
                    comments.push(found);
                    block = None;
                }
                None => lines.push(line),
            }
            continue;
        }

        if let Some(caps) = syntax.inline.captures(line) {
            if let Some(m) = caps.iter().skip(1).flatten().next() {
                let offset = line[..m.start()].chars().count();
                comments.push(comment(syntax, m.as_str(), idx + 1, offset, "line"));
                continue;
            }
        }

        if let Some(start) = syntax.block_start.as_ref().and_then(|re| re.find(line)) {
            if !skip_block {
                let offset = line[..start.start()].chars().count();
                let rest = &line[start.start()..];
                let closes = syntax
                    .block_end
                    .as_ref()
                    .and_then(|re| re.find(&rest[start.len()..]));
                match closes {
                    Some(end) => {
                        let raw = &rest[..start.len() + end.end()];
                        comments.push(comment(syntax, raw, idx + 1, offset, "line"));
                    }
                    None => block = Some((idx + 1, offset, vec![rest])),
                }
                continue;
            }
        }

        if syntax.block_end.as_ref().is_some_and(|re| re.is_match(line)) {
            skip_block = !skip_block;
        }
    }

    comments
}

#![forbid(unsafe_code)]

//! Translating block-local alert coordinates into file coordinates
//!
//! Anchored remapping is used for comments, whose text keeps one line per
//! source line: the alert's line is offset by the block's start line and
//! its columns by where the block line begins inside the raw line. Values
//! from structured data may carry escapes, so each of their lines is found
//! in the source on its own. Located remapping is used for rendered
//! markup, where the block text no longer maps 1:1 onto the source; there
//! the matched text is searched for in a neutralized copy of the source.

use crate::error::LintError;
use crate::model::{Alert, Block, locate};
use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;

/// Position of a block inside its parent content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// 1-based line
    pub line: usize,
    /// 0-based character column
    pub column: usize,
}

/// A search position: 0-based line index and byte column in that line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

/// First occurrence of `needle` at or after `from`, searching line by line
pub fn find_line_by_substring(content: &str, needle: &str, from: Cursor) -> Option<Cursor> {
    if needle.is_empty() {
        return None;
    }
    for (idx, line) in content.split('\n').enumerate().skip(from.line) {
        let start = if idx == from.line { from.column } else { 0 };
        if start > line.len() || !line.is_char_boundary(start) {
            continue;
        }
        if let Some(col) = line[start..].find(needle) {
            return Some(Cursor {
                line: idx,
                column: start + col,
            });
        }
    }
    None
}

/// Character index of `needle` in `haystack`, starting at character `from`
fn find_chars(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let byte_from = haystack
        .char_indices()
        .nth(from)
        .map(|(i, _)| i)
        .unwrap_or(haystack.len());
    haystack[byte_from..]
        .find(needle)
        .map(|b| from + haystack[byte_from..byte_from + b].chars().count())
}

/// The `len` characters of `line` starting at 1-based column `start`
fn chars_at(line: &str, start: usize, len: usize) -> String {
    line.chars().skip(start.saturating_sub(1)).take(len).collect()
}

/// Column where each line of a comment block's text starts in the parent
///
/// `padding` measures the delimiter and indentation in front of the text
/// on a raw line of `block.source`. Merged line comments all start at the
/// block's column; the later lines of a block comment are whole parent
/// lines.
pub fn padded_columns(block: &Block, padding: fn(&str) -> usize) -> Vec<usize> {
    let is_block = block.scope.split('.').any(|s| s == "block");
    block
        .source
        .split('\n')
        .enumerate()
        .map(|(i, raw)| {
            let base = if i == 0 || !is_block { block.column } else { 0 };
            base + padding(raw.trim_end_matches('\r'))
        })
        .collect()
}

/// Move alerts computed against `block_text` into the parent's coordinates
///
/// Only `alerts` (the slice added since the previous block) are touched.
/// `columns` holds the known start column of each block line, if any.
/// Every adjusted alert is checked against the parent so that the text at
/// its span equals the first line of its match; when no consistent column
/// can be found the file fails with [`LintError::NotFound`].
pub fn remap_anchored(
    alerts: &mut [Alert],
    block_text: &str,
    anchor: Anchor,
    columns: &[usize],
    parent: &str,
    file: &Path,
) -> Result<(), LintError> {
    let parent_lines: Vec<&str> = parent.split('\n').collect();
    let block_lines: Vec<&str> = block_text.split('\n').collect();

    for alert in alerts.iter_mut() {
        let not_found = || LintError::NotFound {
            file: file.to_path_buf(),
            needle: alert.matched.clone(),
        };
        let target = (anchor.line + alert.line)
            .checked_sub(2)
            .ok_or_else(not_found)?;
        let raw = parent_lines.get(target).copied().ok_or_else(not_found)?;
        let from = if alert.line == 1 { anchor.column } else { 0 };
        let head = alert.matched.split('\n').next().unwrap_or("");
        let width = head.chars().count();

        let fits = |pad: usize| {
            head.is_empty() || chars_at(raw, alert.span.0 + pad, width) == head
        };

        let padded = columns.get(alert.line - 1).copied().filter(|&pad| fits(pad));
        let by_line = padded.or_else(|| {
            block_lines
                .get(alert.line - 1)
                .map(|l| l.trim_end_matches('\r'))
                .filter(|l| !l.trim().is_empty())
                .and_then(|l| find_chars(raw, l, from))
                .filter(|&pad| fits(pad))
        });

        let pad = match by_line {
            Some(pad) => pad,
            None => {
                let found = find_chars(raw, head, from)
                    .or_else(|| find_chars(raw, head, 0))
                    .ok_or_else(not_found)?;
                (found + 1).checked_sub(alert.span.0).ok_or_else(not_found)?
            }
        };

        alert.line = target + 1;
        alert.span = (alert.span.0 + pad, alert.span.1 + pad);
    }
    Ok(())
}

/// Move alerts computed against a value pulled out of structured data into
/// the coordinates of `parent`
///
/// A value line need not be a source line (`"a\nb"` in JSON is one line),
/// so every non-blank line of `value` is searched for separately, in order,
/// starting at `from`. An alert is placed on its value line's match, or on
/// the first occurrence of its own text after it when escapes changed the
/// line. Returns the position just past the last line that was found.
pub fn remap_value(
    alerts: &mut [Alert],
    value: &str,
    parent: &str,
    from: Cursor,
    file: &Path,
) -> Result<Cursor, LintError> {
    let parent_lines: Vec<&str> = parent.split('\n').collect();
    let value_lines: Vec<&str> = value.split('\n').collect();

    let mut cursor = from;
    let mut found: Vec<Option<Cursor>> = Vec::with_capacity(value_lines.len());
    for line in &value_lines {
        let needle = line.trim();
        let hit = find_line_by_substring(parent, needle, cursor);
        if let Some(hit) = hit {
            cursor = Cursor {
                line: hit.line,
                column: hit.column + needle.len(),
            };
        }
        found.push(hit);
    }

    for alert in alerts.iter_mut() {
        let not_found = || LintError::NotFound {
            file: file.to_path_buf(),
            needle: alert.matched.clone(),
        };
        let index = alert.line.checked_sub(1).ok_or_else(not_found)?;
        let head = alert.matched.split('\n').next().unwrap_or("");
        let width = head.chars().count();
        let fits = |raw: &str, start: usize| head.is_empty() || chars_at(raw, start, width) == head;

        let on_line = found.get(index).copied().flatten().and_then(|hit| {
            let raw = parent_lines.get(hit.line).copied()?;
            let line = value_lines.get(index)?;
            let lead = line.chars().count() - line.trim_start().chars().count();
            let column = raw.get(..hit.column)?.chars().count();
            let start = (column + alert.span.0).checked_sub(lead)?;
            fits(raw, start).then_some((hit.line, start))
        });

        let placed = on_line.or_else(|| {
            let after = found[..(index + 1).min(found.len())]
                .iter()
                .rev()
                .find_map(|hit| *hit)
                .unwrap_or(from);
            let hit = find_line_by_substring(parent, head, after)?;
            let raw = parent_lines.get(hit.line).copied()?;
            Some((hit.line, raw.get(..hit.column)?.chars().count() + 1))
        });

        let (line, start) = placed.ok_or_else(not_found)?;
        alert.line = line + 1;
        alert.span = (start, start + (alert.span.1 - alert.span.0));
    }
    Ok(cursor)
}

/// Shift alerts from a sub-block starting at byte `offset` of `text`
pub fn shift(alerts: &mut [Alert], text: &str, offset: usize) {
    let (line, (column, _)) = locate(text, offset..offset);
    for alert in alerts.iter_mut() {
        if alert.line == 1 {
            alert.span = (alert.span.0 + column - 1, alert.span.1 + column - 1);
        }
        alert.line += line - 1;
    }
}

/// Locates alerts from rendered markup in the original source
///
/// `searchable` is the source after length-preserving neutralization, so
/// byte offsets found in it are valid in `original`. A check never claims
/// the same occurrence twice, which lets repeated phrases resolve to
/// successive locations.
///
/// Rendering drops markup, so a match can span text that never appears
/// contiguously in the source (`with *Vellum*` renders as `with Vellum`).
/// Such a match is pinned to its first word after the block's position and
/// stretched to its last word on the same source line.
pub struct Locator<'a> {
    original: &'a str,
    searchable: String,
    cursor: usize,
    anchored: bool,
    claimed: HashSet<(String, usize)>,
    path: &'a Path,
}

impl<'a> Locator<'a> {
    pub fn new(original: &'a str, searchable: String, path: &'a Path) -> Self {
        debug_assert_eq!(original.len(), searchable.len());
        Locator {
            original,
            searchable,
            cursor: 0,
            anchored: false,
            claimed: HashSet::new(),
            path,
        }
    }

    /// Move the search cursor to where a block appears to begin
    ///
    /// The cursor never moves backwards.
    pub fn enter_block(&mut self, block_text: &str) {
        let first_line = block_text.lines().next().unwrap_or("").trim();
        let first_word: String = block_text
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric())
            .collect();
        self.anchored = false;
        for candidate in [first_line, first_word.as_str()] {
            if let Some(pos) = self.search(candidate, self.cursor, None) {
                self.cursor = pos;
                self.anchored = true;
                return;
            }
        }
    }

    /// Rewrite the alert's line and span to point into `original`
    ///
    /// Fails only when neither the match nor its block can be found.
    pub fn place(&mut self, alert: &mut Alert) -> Result<(), LintError> {
        let needle = alert.matched.clone();
        let range = self
            .search(&needle, self.cursor, Some(&alert.check))
            .or_else(|| self.search(&needle, 0, Some(&alert.check)))
            .map(|pos| pos..pos + needle.len())
            .or_else(|| self.guess(&needle, &alert.check))
            .ok_or_else(|| LintError::NotFound {
                file: self.path.to_path_buf(),
                needle: needle.clone(),
            })?;
        self.claimed.insert((alert.check.clone(), range.start));
        let (line, span) = locate(self.original, range);
        alert.line = line;
        alert.span = span;
        Ok(())
    }

    /// Source range for a match whose text rendering changed
    fn guess(&self, needle: &str, check: &str) -> Option<Range<usize>> {
        let words: Vec<&str> = needle
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let first = words.first().and_then(|w| {
            self.search(w, self.cursor, Some(check))
                .map(|pos| pos..pos + w.len())
        });
        let start = match first {
            Some(range) => range,
            None if self.anchored => {
                let width = self.original[self.cursor..]
                    .chars()
                    .next()
                    .filter(|c| *c != '\n')
                    .map_or(0, char::len_utf8);
                self.cursor..self.cursor + width
            }
            None => return None,
        };

        let rest = self.searchable.get(start.end..)?;
        let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
        let end = words
            .last()
            .filter(|_| words.len() > 1)
            .and_then(|last| {
                let i = line.find(last)?;
                let end = start.end + i + last.len();
                self.original.is_char_boundary(end).then_some(end)
            })
            .unwrap_or(start.end);
        Some(start.start..end)
    }

    fn search(&self, needle: &str, from: usize, check: Option<&str>) -> Option<usize> {
        if needle.is_empty() || from > self.searchable.len() {
            return None;
        }
        let end_ok = |pos: usize| {
            self.original.is_char_boundary(pos)
                && self.original.is_char_boundary(pos + needle.len())
        };
        self.searchable
            .get(from..)?
            .match_indices(needle)
            .map(|(i, _)| from + i)
            .filter(|&pos| end_ok(pos))
            .find(|&pos| match check {
                Some(check) => !self.claimed.contains(&(check.to_string(), pos)),
                None => true,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;

    fn alert(text: &str, needle: &str) -> Alert {
        let start = text.find(needle).unwrap();
        Alert::new("Test.Rule", Level::Warning, "msg").located(text, start..start + needle.len())
    }

    fn at(content: &str, line: usize, span: (usize, usize)) -> String {
        let raw = content.split('\n').nth(line - 1).unwrap();
        chars_at(raw, span.0, span.1 - span.0 + 1)
    }

    #[test]
    fn test_find_line_by_substring_is_monotonic() {
        let content = "title: Hello\nbody: Hello\n";
        let first = find_line_by_substring(content, "Hello", Cursor::default()).unwrap();
        assert_eq!(first, Cursor { line: 0, column: 7 });
        let next = find_line_by_substring(
            content,
            "Hello",
            Cursor {
                line: 0,
                column: first.column + 5,
            },
        )
        .unwrap();
        assert_eq!(next, Cursor { line: 1, column: 6 });
        assert!(find_line_by_substring(content, "missing", Cursor::default()).is_none());
    }

    #[test]
    fn test_remap_comment_block() {
        let parent = "fn main() {}\n    // This is a very bad idea\n    // and very risky.\n";
        let block = "This is a very bad idea\nand very risky.\n";
        let mut alerts = vec![alert(block, "very bad"), alert(block, "risky")];
        remap_anchored(
            &mut alerts,
            block,
            Anchor { line: 2, column: 4 },
            &[],
            parent,
            Path::new("main.rs"),
        )
        .unwrap();
        assert_eq!(alerts[0].line, 2);
        assert_eq!(at(parent, 2, alerts[0].span), "very bad");
        assert_eq!(alerts[1].line, 3);
        assert_eq!(at(parent, 3, alerts[1].span), "risky");
    }

    #[test]
    fn test_remap_only_touches_given_slice() {
        let parent = "a\nb\nkey: some value\n";
        let block = "some value";
        let mut alerts = vec![alert("xx", "xx"), alert(block, "value")];
        let before = alerts[0].clone();
        remap_anchored(
            &mut alerts[1..],
            block,
            Anchor { line: 3, column: 0 },
            &[],
            parent,
            Path::new("a.yml"),
        )
        .unwrap();
        assert_eq!(alerts[0], before);
        assert_eq!(alerts[1].line, 3);
        assert_eq!(at(parent, 3, alerts[1].span), "value");
    }

    #[test]
    fn test_remap_missing_text_is_an_error() {
        let mut alerts = vec![alert("ghost text", "ghost")];
        let err = remap_anchored(
            &mut alerts,
            "ghost text",
            Anchor { line: 1, column: 0 },
            &[],
            "nothing here",
            Path::new("x.txt"),
        )
        .unwrap_err();
        assert!(matches!(err, LintError::NotFound { .. }));
    }

    #[test]
    fn test_padded_columns_drive_comment_remap() {
        let parent = "fn f() {}\n    /// very very good\n    /// and very risky\n";
        let block = Block::new("very very good\nand very risky", "text.comment.line.rs")
            .with_source("/// very very good\n/// and very risky")
            .at(2, 4);
        let padding: fn(&str) -> usize = |s| if s.starts_with("/// ") { 4 } else { 0 };
        let columns = padded_columns(&block, padding);
        assert_eq!(columns, vec![8, 8]);

        let second = block.text.match_indices("very").nth(1).unwrap().0;
        let third = block.text.rfind("very").unwrap();
        let mut alerts = vec![
            Alert::new("T.Very", Level::Warning, "m").located(&block.text, second..second + 4),
            Alert::new("T.Very", Level::Warning, "m").located(&block.text, third..third + 4),
        ];
        remap_anchored(
            &mut alerts,
            &block.text,
            Anchor { line: 2, column: 4 },
            &columns,
            parent,
            Path::new("lib.rs"),
        )
        .unwrap();
        assert_eq!((alerts[0].line, alerts[0].span), (2, (14, 17)));
        assert_eq!((alerts[1].line, alerts[1].span), (3, (13, 16)));
    }

    #[test]
    fn test_padded_columns_for_block_comments() {
        let block = Block::new("Docs here\nmore docs\n", "text.comment.block.py")
            .with_source("\"\"\"Docs here\n    more docs\n    \"\"\"")
            .at(2, 4);
        let padding: fn(&str) -> usize = |s| {
            let lead = s.len() - s.trim_start().len();
            lead + if s.trim_start().starts_with("\"\"\"") { 3 } else { 0 }
        };
        assert_eq!(padded_columns(&block, padding), vec![7, 4, 7]);
    }

    #[test]
    fn test_remap_value_with_escaped_newlines() {
        let parent = "{\n  \"summary\": \"First line.\\nA very long line.\"\n}\n";
        let value = "First line.\nA very long line.";
        let mut alerts = vec![alert(value, "very")];
        assert_eq!(alerts[0].line, 2);
        let cursor = remap_value(&mut alerts, value, parent, Cursor::default(), Path::new("a.json"))
            .unwrap();
        assert_eq!(alerts[0].line, 2);
        assert_eq!(at(parent, 2, alerts[0].span), "very");
        assert_eq!(cursor.line, 1);
    }

    #[test]
    fn test_remap_value_with_leading_escaped_newlines() {
        let parent = "{\"summary\": \"\\n\\nvery nice\"}";
        let value = "\n\nvery nice";
        let mut alerts = vec![alert(value, "very")];
        assert_eq!(alerts[0].line, 3);
        remap_value(&mut alerts, value, parent, Cursor::default(), Path::new("a.json")).unwrap();
        assert_eq!(alerts[0].line, 1);
        assert_eq!(at(parent, 1, alerts[0].span), "very");
    }

    #[test]
    fn test_remap_value_with_escaped_quotes() {
        let parent = "{\"q\": \"He said \\\"very\\\" twice\"}";
        let value = "He said \"very\" twice";
        let mut alerts = vec![alert(value, "very")];
        remap_value(&mut alerts, value, parent, Cursor::default(), Path::new("a.json")).unwrap();
        assert_eq!(at(parent, 1, alerts[0].span), "very");
    }

    #[test]
    fn test_remap_value_missing_text_is_an_error() {
        let mut alerts = vec![alert("ghost text", "ghost")];
        let err = remap_value(
            &mut alerts,
            "ghost text",
            "nothing here",
            Cursor::default(),
            Path::new("a.yml"),
        )
        .unwrap_err();
        assert!(matches!(err, LintError::NotFound { .. }));
    }

    #[test]
    fn test_shift_sub_block() {
        let text = "One sentence. Another one\nwith a bad word.";
        let offset = text.find("Another").unwrap();
        let sub = &text[offset..];
        let mut alerts = vec![alert(sub, "Another"), alert(sub, "bad")];
        shift(&mut alerts, text, offset);
        assert_eq!((alerts[0].line, alerts[0].span), (1, (15, 21)));
        assert_eq!((alerts[1].line, alerts[1].span), (2, (8, 10)));
    }

    #[test]
    fn test_locator_advances_over_claimed_matches() {
        let source = "# Title\n\nvery good and very bad\n";
        let path = Path::new("doc.md");
        let mut locator = Locator::new(source, source.to_string(), path);
        locator.enter_block("very good and very bad");

        let mut first = Alert::new("A.Weasel", Level::Warning, "m");
        first.matched = "very".to_string();
        let mut second = first.clone();
        locator.place(&mut first).unwrap();
        locator.place(&mut second).unwrap();
        assert_eq!((first.line, first.span), (3, (1, 4)));
        assert_eq!((second.line, second.span), (3, (15, 18)));

        let mut other_check = Alert::new("B.Other", Level::Warning, "m");
        other_check.matched = "very".to_string();
        locator.place(&mut other_check).unwrap();
        assert_eq!(other_check.span, (1, 4));
    }

    #[test]
    fn test_locator_stretches_over_dropped_markup() {
        let source = "# Getting Started with *Vellum*\n\nBody text.\n";
        let mut locator = Locator::new(source, source.to_string(), Path::new("doc.md"));
        locator.enter_block("Getting Started with Vellum");
        let mut alert = Alert::new("A.Headings", Level::Suggestion, "m");
        alert.matched = "Getting Started with Vellum".to_string();
        locator.place(&mut alert).unwrap();
        assert_eq!((alert.line, alert.span), (1, (3, 30)));
    }

    #[test]
    fn test_locator_falls_back_to_block_position() {
        let source = "Intro.\n\nA [link](https://x.example) here.\n";
        let mut locator = Locator::new(source, source.to_string(), Path::new("doc.md"));
        locator.enter_block("A link here.");
        let mut alert = Alert::new("A.Punct", Level::Warning, "m");
        alert.matched = " .".to_string();
        locator.place(&mut alert).unwrap();
        assert_eq!((alert.line, alert.span), (3, (1, 1)));
    }

    #[test]
    fn test_locator_unanchored_block_is_an_error() {
        let source = "Nothing relevant.\n";
        let mut locator = Locator::new(source, source.to_string(), Path::new("doc.md"));
        locator.enter_block("Completely different");
        let mut alert = Alert::new("A.Rule", Level::Warning, "m");
        alert.matched = "Completely different".to_string();
        assert!(matches!(locator.place(&mut alert), Err(LintError::NotFound { .. })));
    }

    #[test]
    fn test_locator_skips_neutralized_text() {
        let source = "```json\n{}\n```\n\nSome json here.\n";
        let searchable = "```****\n{}\n```\n\nSome json here.\n".to_string();
        let mut locator = Locator::new(source, searchable, Path::new("a.md"));
        let mut alert = Alert::new("A.Json", Level::Error, "m");
        alert.matched = "json".to_string();
        locator.place(&mut alert).unwrap();
        assert_eq!((alert.line, alert.span), (5, (6, 9)));
    }
}
